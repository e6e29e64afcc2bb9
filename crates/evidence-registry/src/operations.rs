//! Handlers for the built-in operations
//!
//! Each handler parses its arguments, runs the engine and serializes the
//! result. Handlers hold no state.

use crate::error::{RegistryError, Result};
use crate::requests::{
    request_config, BiasRequest, EffectSizeRequest, HeterogeneityRequest, NetworkRequest,
    PlotRequest, PoolRequest,
};
use evidence_bias::{detect_publication_bias, trim_and_fill, PublicationBiasResult, TrimAndFill};
use evidence_core::{AnalysisConfig, EffectEstimate};
use evidence_effect::calculate_effect_sizes;
use evidence_network::{run_network_analysis, NetworkAnalysis};
use evidence_plot::{
    forest_plot, funnel_plot, funnel_plot_with_fill, league_table, network_plot, prisma_flow,
    ranking_chart, traffic_light, PlotData,
};
use evidence_pooling::{
    assess_heterogeneity, leave_one_out, pool_effects, subgroup_analysis,
    subgroups_from_covariate, LeaveOneOut, PooledResult, SubgroupAnalysis,
};
use serde::Serialize;
use serde_json::Value;

fn output<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(RegistryError::Output)
}

pub(crate) fn calculate_effect_size(args: Value, config: &AnalysisConfig) -> Result<Value> {
    let request: EffectSizeRequest = serde_json::from_value(args)?;
    let estimates = calculate_effect_sizes(&request.studies, request.measure, config)?;
    output(&estimates)
}

#[derive(Debug, Serialize)]
struct PoolResponse {
    pooled: PooledResult,
    estimates: Vec<EffectEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    leave_one_out: Option<Vec<LeaveOneOut>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subgroups: Option<SubgroupAnalysis>,
}

fn run_pooling(request: &PoolRequest, base: &AnalysisConfig) -> Result<PoolResponse> {
    let config = request_config(base, request.alpha, request.hartung_knapp)?;
    let estimates = calculate_effect_sizes(&request.studies, request.measure, &config)?;
    let pooled = pool_effects(&estimates, request.model, &config)?;

    let leave_one_out = if request.leave_one_out {
        Some(leave_one_out(&estimates, request.model, &config)?)
    } else {
        None
    };
    let subgroups = match &request.subgroup_by {
        Some(covariate) => {
            let assignments = subgroups_from_covariate(&request.studies, covariate)?;
            Some(subgroup_analysis(&estimates, &assignments, request.model, &config)?)
        }
        None => None,
    };

    Ok(PoolResponse {
        pooled,
        estimates,
        leave_one_out,
        subgroups,
    })
}

pub(crate) fn pool(args: Value, config: &AnalysisConfig) -> Result<Value> {
    let request: PoolRequest = serde_json::from_value(args)?;
    output(&run_pooling(&request, config)?)
}

pub(crate) fn heterogeneity(args: Value, config: &AnalysisConfig) -> Result<Value> {
    let request: HeterogeneityRequest = serde_json::from_value(args)?;
    let estimates = calculate_effect_sizes(&request.studies, request.measure, config)?;
    output(&assess_heterogeneity(&estimates)?)
}

#[derive(Debug, Serialize)]
struct BiasResponse {
    bias: PublicationBiasResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    trim_and_fill: Option<TrimAndFill>,
}

fn run_bias(request: &BiasRequest, base: &AnalysisConfig) -> Result<(BiasResponse, PooledResult)> {
    let config = request_config(base, request.alpha, None)?;
    let estimates = calculate_effect_sizes(&request.studies, request.measure, &config)?;
    let bias = detect_publication_bias(&estimates, &config)?;
    let pooled = pool_effects(&estimates, request.model, &config)?;
    let fill = if request.trim_and_fill {
        Some(trim_and_fill(&estimates, request.model, &config)?)
    } else {
        None
    };
    let response = BiasResponse {
        bias,
        trim_and_fill: fill,
    };
    Ok((response, pooled))
}

pub(crate) fn publication_bias(args: Value, config: &AnalysisConfig) -> Result<Value> {
    let request: BiasRequest = serde_json::from_value(args)?;
    let (response, _) = run_bias(&request, config)?;
    output(&response)
}

fn run_network(request: &NetworkRequest, base: &AnalysisConfig) -> Result<NetworkAnalysis> {
    let config = request.config(base)?;
    let studies = request.network_studies()?;
    Ok(run_network_analysis(&studies, &request.options(), &config)?)
}

pub(crate) fn network(args: Value, config: &AnalysisConfig) -> Result<Value> {
    let request: NetworkRequest = serde_json::from_value(args)?;
    output(&run_network(&request, config)?)
}

pub(crate) fn plot(args: Value, config: &AnalysisConfig) -> Result<Value> {
    let request: PlotRequest = serde_json::from_value(args)?;
    let data = match request {
        PlotRequest::Forest(forest) => {
            let response = run_pooling(&forest.analysis, config)?;
            let plot_config = request_config(config, forest.analysis.alpha, None)?;
            PlotData::Forest(forest_plot(
                &response.estimates,
                &response.pooled,
                forest.order.as_deref(),
                &plot_config,
            )?)
        }
        PlotRequest::Funnel(request) => {
            let plot_config = request_config(config, request.alpha, None)?;
            let (response, pooled) = run_bias(&request, config)?;
            PlotData::Funnel(match &response.trim_and_fill {
                Some(fill) => funnel_plot_with_fill(&response.bias, fill, &plot_config)?,
                None => funnel_plot(&response.bias, &pooled, &plot_config)?,
            })
        }
        PlotRequest::TrafficLight {
            judgements,
            study_order,
            domain_order,
        } => PlotData::TrafficLight(traffic_light(
            &judgements,
            study_order.as_deref(),
            domain_order.as_deref(),
        )?),
        PlotRequest::Prisma { counts } => PlotData::Prisma(prisma_flow(&counts)?),
        PlotRequest::Network(request) => {
            PlotData::Network(network_plot(&run_network(&request, config)?))
        }
        PlotRequest::Ranking(request) => {
            PlotData::Ranking(ranking_chart(&run_network(&request, config)?))
        }
        PlotRequest::League(request) => PlotData::League {
            tables: league_table(&run_network(&request, config)?)?,
        },
    };
    output(&data)
}
