//! 规则引擎集成测试
//!
//! 通过公开 API 测试完整的解析、求值工作流。

use json_logic::{evaluate, evaluate_async, FunctionRegistry, JsonLogic, RuleError};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn eval(rule: Value, data: Value) -> Result<Value, RuleError> {
    evaluate(&rule, &data, &FunctionRegistry::new())
}

/// 创建测试上下文：用户及其地址
fn create_user_context() -> Value {
    json!({
        "usuario": {
            "nome": "X",
            "enderecos": ["A", "B"]
        }
    })
}

/// 信用审批规则：未成年拒绝，低分或有欠款转人工，否则通过
fn credit_rule() -> Value {
    json!({
        "if": [
            {"<": [{"var": "Idade"}, 18]},
            "RECUSADO",
            {
                "if": [
                    {"<": [{"var": "pontuacao_credito"}, 750]},
                    "ANALISE_MANUAL",
                    {
                        "if": [
                            {"!=": [{"var": "possui_divida_ativa"}, false]},
                            "ANALISE_MANUAL",
                            "APROVADO"
                        ]
                    }
                ]
            }
        ]
    })
}

// ==================== 字面量与空节点 ====================

#[test]
fn test_literals_evaluate_to_themselves() {
    let literals = [
        json!(null),
        json!(true),
        json!(42),
        json!(-1.5),
        json!("texto"),
        json!([1, "a", null]),
        json!([{"var": "a"}, 2]),
    ];

    for literal in literals {
        assert_eq!(eval(literal.clone(), json!({"a": 1})).unwrap(), literal);
    }
}

#[test]
fn test_empty_node_is_null() {
    assert_eq!(eval(json!({}), json!({"a": 1})).unwrap(), Value::Null);
}

// ==================== 比较 ====================

#[test]
fn test_chained_less_than() {
    assert_eq!(eval(json!({"<": [1, 2, 3, 4]}), json!({})).unwrap(), json!(true));
    assert_eq!(eval(json!({"<": [1, 3, 2, 4]}), json!({})).unwrap(), json!(false));
    // 不可比较的类型视为 false，不报错
    assert_eq!(eval(json!({"<": ["a", 1]}), json!({})).unwrap(), json!(false));
}

// ==================== 变量 ====================

#[test]
fn test_var_paths() {
    let data = create_user_context();

    assert_eq!(eval(json!({"var": "usuario.nome"}), data.clone()).unwrap(), json!("X"));
    assert_eq!(
        eval(json!({"var": "usuario.enderecos.1"}), data.clone()).unwrap(),
        json!("B")
    );
    assert_eq!(eval(json!({"var": "usuario.nope"}), data.clone()).unwrap(), Value::Null);
    assert_eq!(
        eval(json!({"var": ["usuario.nope", "default"]}), data).unwrap(),
        json!("default")
    );
}

#[test]
fn test_var_path_from_rule() {
    let data = json!({"campo": "usuario.nome", "usuario": {"nome": "X"}});
    let rule = json!({"var": {"var": "campo"}});
    assert_eq!(eval(rule, data).unwrap(), json!("X"));
}

// ==================== 宿主函数 ====================

#[test]
fn test_apply_errors() {
    let err = eval(json!({"apply": []}), json!({})).unwrap_err();
    assert!(matches!(err, RuleError::MissingFunctionName));

    let err = eval(json!({"apply": ["missing"]}), json!({})).unwrap_err();
    assert!(matches!(err, RuleError::FunctionNotRegistered(name) if name == "missing"));
}

#[test]
fn test_apply_host_error_propagates() {
    let functions =
        FunctionRegistry::new().with("falha", |_| Err(anyhow::anyhow!("serviço indisponível")));

    let err = evaluate(&json!({"apply": ["falha"]}), &json!({}), &functions).unwrap_err();
    assert!(matches!(err, RuleError::Host(_)));
    assert_eq!(err.to_string(), "serviço indisponível");
}

#[test]
fn test_apply_with_var_arguments() {
    let functions = FunctionRegistry::new().with("get_area", |args| {
        let l = args[0].as_f64().unwrap_or_default();
        let a = args[1].as_f64().unwrap_or_default();
        Ok(json!(l * a))
    });
    let data = json!({"retangulo": {"l": 10, "a": 5}});
    let rule = json!({"apply": ["get_area", {"var": "retangulo.l"}, {"var": "retangulo.a"}]});

    assert_eq!(evaluate(&rule, &data, &functions).unwrap(), json!(50.0));
}

#[test]
fn test_ternary_evaluates_both_branches() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let functions = FunctionRegistry::new().with("f", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(json!("efeito"))
    });

    let rule = json!({"if": [false, {"apply": ["f"]}, "else"]});
    assert_eq!(evaluate(&rule, &json!({}), &functions).unwrap(), json!("else"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// 规则先整体解析再求值：任一节点的操作符未知或参数个数不对，整条规则在解析阶段
/// 即被拒绝，排在前面的兄弟节点中的函数也不会被调用（不同于边求值边分派的做法）。
#[test]
fn test_malformed_rule_rejected_during_parsing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let functions = FunctionRegistry::new().with("f", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(json!(1))
    });

    let rule = json!({"and": [{"apply": ["f"]}, {"xor": [1, 2]}]});
    let err = evaluate(&rule, &json!({}), &functions).unwrap_err();
    assert!(matches!(err, RuleError::UnknownOperator(op) if op == "xor"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let rule = json!({"and": [{"apply": ["f"]}, {">": [1, 2, 3]}]});
    let err = evaluate(&rule, &json!({}), &functions).unwrap_err();
    assert!(matches!(err, RuleError::InvalidArguments { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ==================== 算术 ====================

#[test]
fn test_arithmetic() {
    assert_eq!(eval(json!({"+": ["10", "20"]}), json!({})).unwrap(), json!(30));
    assert_eq!(eval(json!({"*": [2, 3.5]}), json!({})).unwrap(), json!(7));
    assert_eq!(eval(json!({"-": [5]}), json!({})).unwrap(), json!(-5));
    assert_eq!(eval(json!({"/": [7, 2]}), json!({})).unwrap(), json!(3.5));

    let err = eval(json!({"/": [10, 0]}), json!({})).unwrap_err();
    assert!(matches!(err, RuleError::DivisionByZero));
}

// ==================== 集合 ====================

#[test]
fn test_map_doubles_elements() {
    let rule = json!({"map": [[1, 2, 3], {"*": [{"var": ""}, 2]}]});
    assert_eq!(eval(rule, json!({})).unwrap(), json!([2, 4, 6]));
}

#[test]
fn test_collection_operators_on_context() {
    let data = json!({"pedidos": [{"valor": 10}, {"valor": 250}, {"valor": 40}]});

    let rule = json!({"filter": [{"var": "pedidos"}, {">": [{"var": "valor"}, 30]}]});
    assert_eq!(
        eval(rule, data.clone()).unwrap(),
        json!([{"valor": 250}, {"valor": 40}])
    );

    let rule = json!({"some": [{"var": "pedidos"}, {">": [{"var": "valor"}, 200]}]});
    assert_eq!(eval(rule, data.clone()).unwrap(), json!(true));

    let rule = json!({"every": [{"var": "pedidos"}, {">": [{"var": "valor"}, 5]}]});
    assert_eq!(eval(rule, data.clone()).unwrap(), json!(true));

    let rule = json!({
        "reduce": [
            {"var": "pedidos"},
            {"+": [{"var": "accumulator"}, {"var": "current.valor"}]},
            0
        ]
    });
    assert_eq!(eval(rule, data).unwrap(), json!(300));
}

// ==================== 完整业务规则 ====================

#[test]
fn test_credit_rule_decisions() {
    let cases = [
        (json!({"Idade": 16, "pontuacao_credito": 800, "possui_divida_ativa": false}), "RECUSADO"),
        (json!({"Idade": 30, "pontuacao_credito": 700, "possui_divida_ativa": false}), "ANALISE_MANUAL"),
        (json!({"Idade": 30, "pontuacao_credito": 800, "possui_divida_ativa": true}), "ANALISE_MANUAL"),
        (json!({"Idade": 30, "pontuacao_credito": 800, "possui_divida_ativa": false}), "APROVADO"),
    ];

    for (data, expected) in cases {
        assert_eq!(eval(credit_rule(), data).unwrap(), json!(expected));
    }
}

#[test]
fn test_validation_rule_flags_missing_score() {
    let rule = json!({
        "if": [{"==": [{"var": "pontuacao_credito"}, null]}, "ERRO_SCORE_INVALIDO", null]
    });

    assert_eq!(eval(rule.clone(), json!({"Idade": 30})).unwrap(), json!("ERRO_SCORE_INVALIDO"));
    assert_eq!(eval(rule, json!({"pontuacao_credito": 720})).unwrap(), Value::Null);
}

#[test]
fn test_compile_reports_references() {
    let compiled = JsonLogic::default().compile(&credit_rule()).unwrap();
    let fields: Vec<_> = compiled.required_fields.iter().cloned().collect();
    assert_eq!(
        fields,
        vec!["Idade", "pontuacao_credito", "possui_divida_ativa"]
    );
    assert!(compiled.functions.is_empty());
}

// ==================== 同步与异步一致性 ====================

#[tokio::test]
async fn test_async_matches_sync_for_sync_registry() {
    let functions = FunctionRegistry::new().with("dobro", |args| {
        let n = args.first().and_then(Value::as_f64).unwrap_or_default();
        Ok(json!(n * 2.0))
    });
    let data = json!({"Idade": 30, "pontuacao_credito": 800, "possui_divida_ativa": false, "n": 4});

    let rules = [
        credit_rule(),
        json!({"apply": ["dobro", {"var": "n"}]}),
        json!({"map": [[1, 2], {"apply": ["dobro", {"var": ""}]}]}),
        json!({"cat": ["a", 1, null]}),
        json!({"/": [1, 0]}),
    ];

    for rule in rules {
        let sync = evaluate(&rule, &data, &functions);
        let asynchronous = evaluate_async(&rule, &data, &functions).await;
        match (sync, asynchronous) {
            (Ok(a), Ok(b)) => assert_eq!(a, b),
            (Err(a), Err(b)) => assert_eq!(a.kind(), b.kind()),
            (a, b) => panic!("sync {:?} != async {:?}", a, b),
        }
    }
}
