//! End-to-end dispatch through the default registry

use approx::assert_abs_diff_eq;
use evidence_core::AnalysisConfig;
use evidence_registry::OperationRegistry;
use serde_json::{json, Value};

fn binary_studies() -> Value {
    json!([
        {"study_id": "S1", "events_treatment": 10, "total_treatment": 100,
         "events_control": 5, "total_control": 100,
         "covariates": {"region": "EU"}},
        {"study_id": "S2", "events_treatment": 20, "total_treatment": 100,
         "events_control": 10, "total_control": 100,
         "covariates": {"region": "EU"}},
        {"study_id": "S3", "events_treatment": 15, "total_treatment": 120,
         "events_control": 14, "total_control": 118,
         "covariates": {"region": "US"}},
        {"study_id": "S4", "events_treatment": 8, "total_treatment": 60,
         "events_control": 9, "total_control": 61,
         "covariates": {"region": "US"}}
    ])
}

fn chain_network() -> Value {
    json!({
        "measure": "MD",
        "seed": 7,
        "simulations": 4000,
        "studies": [
            {"study_id": "AB1", "treatment": "B", "comparator": "A",
             "mean_t": 1.5, "sd_t": 1.0, "n_t": 50, "mean_c": 1.0, "sd_c": 1.0, "n_c": 50},
            {"study_id": "BC1", "arms": [
                {"treatment": "B", "mean": 1.5, "sd": 1.0, "n": 40},
                {"treatment": "C", "mean": 2.3, "sd": 1.0, "n": 40}
            ]}
        ]
    })
}

#[test]
fn test_effect_sizes_in_input_order() {
    let registry = OperationRegistry::default();
    let out = registry
        .dispatch(
            "calculate_effect_size",
            json!({"measure": "OR", "studies": binary_studies()}),
            &AnalysisConfig::default(),
        )
        .unwrap();

    let estimates = out.as_array().unwrap();
    assert_eq!(estimates.len(), 4);
    assert_eq!(estimates[0]["study_id"], "S1");
    let expected = (10.0_f64 * 95.0 / (90.0 * 5.0)).ln();
    assert_abs_diff_eq!(estimates[0]["estimate"].as_f64().unwrap(), expected, epsilon = 1e-9);
    assert_eq!(estimates[0]["log_scale"], true);
}

#[test]
fn test_pooling_with_sensitivity_and_subgroups() {
    let registry = OperationRegistry::default();
    let out = registry
        .dispatch(
            "pool_effects",
            json!({
                "measure": "OR",
                "model": "random",
                "studies": binary_studies(),
                "leave_one_out": true,
                "subgroup_by": "region"
            }),
            &AnalysisConfig::default(),
        )
        .unwrap();

    assert_eq!(out["pooled"]["model"], "random");
    assert_eq!(out["leave_one_out"].as_array().unwrap().len(), 4);
    assert_eq!(out["leave_one_out"][1]["omitted_study"], "S2");
    let subgroups = out["subgroups"]["subgroups"].as_array().unwrap();
    assert_eq!(subgroups.len(), 2);
    assert_eq!(subgroups[0]["label"], "EU");
    assert_eq!(out["subgroups"]["degrees_of_freedom"], 1);
}

#[test]
fn test_pooling_without_extras_omits_them() {
    let registry = OperationRegistry::default();
    let out = registry
        .dispatch(
            "pool_effects",
            json!({"measure": "RR", "studies": binary_studies()}),
            &AnalysisConfig::default(),
        )
        .unwrap();
    assert!(out.get("leave_one_out").is_none());
    assert!(out.get("subgroups").is_none());
}

#[test]
fn test_double_zero_study_reported_not_fatal() {
    let registry = OperationRegistry::default();
    let studies = json!([
        {"study_id": "S1", "events_treatment": 10, "total_treatment": 100,
         "events_control": 5, "total_control": 100},
        {"study_id": "Z", "events_treatment": 0, "total_treatment": 50,
         "events_control": 0, "total_control": 50},
        {"study_id": "S2", "events_treatment": 20, "total_treatment": 100,
         "events_control": 10, "total_control": 100}
    ]);
    let out = registry
        .dispatch(
            "pool_effects",
            json!({"measure": "RD", "studies": studies}),
            &AnalysisConfig::default(),
        )
        .unwrap();
    assert_eq!(out["pooled"]["excluded_studies"], json!(["Z"]));
    assert_eq!(out["pooled"]["weights"].as_array().unwrap().len(), 2);
    assert_eq!(out["estimates"].as_array().unwrap().len(), 3);
}

#[test]
fn test_request_alpha_widens_interval() {
    let registry = OperationRegistry::default();
    let config = AnalysisConfig::default();
    let narrow = registry
        .dispatch(
            "pool_effects",
            json!({"measure": "OR", "studies": binary_studies(), "alpha": 0.2}),
            &config,
        )
        .unwrap();
    let wide = registry
        .dispatch(
            "pool_effects",
            json!({"measure": "OR", "studies": binary_studies(), "alpha": 0.01}),
            &config,
        )
        .unwrap();

    let width = |v: &Value| {
        v["pooled"]["confidence_interval"]["upper"].as_f64().unwrap()
            - v["pooled"]["confidence_interval"]["lower"].as_f64().unwrap()
    };
    assert!(width(&wide) > width(&narrow));
}

#[test]
fn test_heterogeneity_needs_two_studies() {
    let registry = OperationRegistry::default();
    let studies = json!([{"study_id": "S1", "events_treatment": 1, "total_treatment": 10,
                          "events_control": 2, "total_control": 10}]);
    let err = registry
        .dispatch(
            "assess_heterogeneity",
            json!({"measure": "OR", "studies": studies}),
            &AnalysisConfig::default(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), "InsufficientDataError");
}

#[test]
fn test_invalid_study_reports_study_and_field() {
    let registry = OperationRegistry::default();
    let studies = json!([{"study_id": "Bad", "events_treatment": 1, "total_treatment": 0,
                          "events_control": 2, "total_control": 10}]);
    let envelope = registry.invoke(
        "calculate_effect_size",
        json!({"measure": "OR", "studies": studies}),
        &AnalysisConfig::default(),
    );

    assert!(envelope.get("ok").is_none());
    assert_eq!(envelope["error"]["kind"], "InvalidInputError");
    assert_eq!(envelope["error"]["study_id"], "Bad");
    assert_eq!(envelope["error"]["field"], "total_treatment");
}

#[test]
fn test_malformed_arguments() {
    let registry = OperationRegistry::default();
    let err = registry
        .dispatch(
            "pool_effects",
            json!({"studies": binary_studies()}),
            &AnalysisConfig::default(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidInputError");
    assert!(err.to_string().contains("measure"));
}

#[test]
fn test_bias_with_trim_and_fill() {
    let registry = OperationRegistry::default();
    let out = registry
        .dispatch(
            "detect_publication_bias",
            json!({"measure": "OR", "studies": binary_studies(), "trim_and_fill": true}),
            &AnalysisConfig::default(),
        )
        .unwrap();

    assert_eq!(out["bias"]["funnel_points"].as_array().unwrap().len(), 4);
    assert!(out["bias"]["egger"].is_object());
    assert!(out["bias"]["begg"].is_object());
    assert!(out["trim_and_fill"]["missing_studies"].as_u64().is_some());
}

#[test]
fn test_bias_low_power_is_a_warning() {
    let registry = OperationRegistry::default();
    let studies = json!([
        {"study_id": "S1", "events_treatment": 10, "total_treatment": 100,
         "events_control": 5, "total_control": 100},
        {"study_id": "S2", "events_treatment": 20, "total_treatment": 100,
         "events_control": 10, "total_control": 100}
    ]);
    let out = registry
        .dispatch(
            "detect_publication_bias",
            json!({"measure": "OR", "studies": studies}),
            &AnalysisConfig::default(),
        )
        .unwrap();
    assert_eq!(out["bias"]["warnings"][0]["kind"], "low_power");
    assert!(out["bias"]["egger"].is_null());
    assert_eq!(out["bias"]["is_asymmetric"], false);
}

#[test]
fn test_network_chain_is_reproducible() {
    let registry = OperationRegistry::default();
    let config = AnalysisConfig::default();
    let first = registry
        .dispatch("run_network_analysis", chain_network(), &config)
        .unwrap();
    let second = registry
        .dispatch("run_network_analysis", chain_network(), &config)
        .unwrap();
    assert_eq!(first, second);

    assert_eq!(first["geometry"]["connected"], true);
    assert_eq!(first["comparisons"].as_array().unwrap().len(), 3);
    assert_eq!(first["ranking_summary"]["seed"], 7);
    assert_eq!(first["ranking_summary"]["simulations"], 4000);

    let rankings = first["rankings"].as_array().unwrap();
    let best = rankings
        .iter()
        .max_by(|a, b| {
            a["sucra"]
                .as_f64()
                .unwrap()
                .total_cmp(&b["sucra"].as_f64().unwrap())
        })
        .unwrap();
    assert_eq!(best["treatment"], "C");
}

#[test]
fn test_plot_data_for_each_kind() {
    let registry = OperationRegistry::default();
    let config = AnalysisConfig::default();

    let forest = registry
        .dispatch(
            "generate_plot_data",
            json!({"plot_type": "forest", "measure": "OR", "studies": binary_studies(),
                   "order": ["S4", "S3", "S2", "S1"]}),
            &config,
        )
        .unwrap();
    assert_eq!(forest["plot_type"], "forest");
    assert_eq!(forest["rows"][0]["label"], "S4");
    assert_eq!(forest["rows"].as_array().unwrap().len(), 5);

    let funnel = registry
        .dispatch(
            "generate_plot_data",
            json!({"plot_type": "funnel", "measure": "OR", "studies": binary_studies()}),
            &config,
        )
        .unwrap();
    assert_eq!(funnel["plot_type"], "funnel");
    assert_eq!(funnel["points"].as_array().unwrap().len(), 4);

    let traffic = registry
        .dispatch(
            "generate_plot_data",
            json!({"plot_type": "traffic_light",
                   "judgements": {"S1": {"randomization": "low", "blinding": "high"},
                                  "S2": {"randomization": "some_concerns"}}}),
            &config,
        )
        .unwrap();
    assert_eq!(traffic["plot_type"], "traffic_light");

    let mut league_args = chain_network();
    league_args["plot_type"] = json!("league");
    let league = registry
        .dispatch("generate_plot_data", league_args, &config)
        .unwrap();
    assert_eq!(league["plot_type"], "league");
    assert_eq!(league["tables"].as_array().unwrap().len(), 1);
    assert_eq!(league["tables"][0]["treatments"].as_array().unwrap().len(), 3);
}

#[test]
fn test_unknown_plot_type() {
    let registry = OperationRegistry::default();
    let err = registry
        .dispatch(
            "generate_plot_data",
            json!({"plot_type": "bubble"}),
            &AnalysisConfig::default(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidInputError");
}
