//! Plot data built from real analysis pipelines

use evidence_bias::detect_publication_bias;
use evidence_core::{AnalysisConfig, EffectMeasure, PoolingModel, StudyRecord};
use evidence_effect::calculate_effect_sizes;
use evidence_plot::{forest_plot, funnel_plot, PlotData, RowKind};
use evidence_pooling::pool_effects;

fn studies() -> Vec<StudyRecord> {
    vec![
        StudyRecord::binary("Adams 2015", 12.0, 110.0, 20.0, 108.0),
        StudyRecord::binary("Baker 2017", 8.0, 95.0, 15.0, 97.0),
        StudyRecord::binary("Chen 2018", 0.0, 40.0, 4.0, 42.0),
        StudyRecord::binary("Diaz 2021", 30.0, 300.0, 41.0, 296.0),
    ]
}

#[test]
fn test_odds_ratio_forest_plot() {
    let config = AnalysisConfig::default();
    let estimates = calculate_effect_sizes(&studies(), EffectMeasure::OddsRatio, &config).unwrap();
    let pooled = pool_effects(&estimates, PoolingModel::Random, &config).unwrap();
    let plot = forest_plot(&estimates, &pooled, None, &config).unwrap();

    assert!(plot.log_axis);
    assert_eq!(plot.null_value, 1.0);
    assert_eq!(plot.rows.len(), 5);
    assert_eq!(plot.rows.last().unwrap().kind, RowKind::Summary);
    for row in &plot.rows {
        assert!(row.lower > 0.0 && row.lower < row.estimate && row.estimate < row.upper);
    }
    assert!(plot.prediction_interval.is_some());
    assert!(plot.i_squared.is_some());
}

#[test]
fn test_plot_data_serializes_with_tag() {
    let config = AnalysisConfig::default();
    let estimates = calculate_effect_sizes(&studies(), EffectMeasure::RiskRatio, &config).unwrap();
    let pooled = pool_effects(&estimates, PoolingModel::Fixed, &config).unwrap();
    let bias = detect_publication_bias(&estimates, &config).unwrap();
    let plot = PlotData::Funnel(funnel_plot(&bias, &pooled, &config).unwrap());

    let json = serde_json::to_value(&plot).unwrap();
    assert_eq!(json["plot_type"], "funnel");
    assert_eq!(json["points"].as_array().unwrap().len(), 4);
    assert_eq!(plot.kind(), "funnel");

    let back: PlotData = serde_json::from_value(json).unwrap();
    assert_eq!(back.kind(), "funnel");
}
