//! Rendering-agnostic plot data
//!
//! Pure mappings from analysis results to records a renderer can draw.
//! Nothing here computes statistics beyond ordering and interval endpoints,
//! and nothing knows about images, colours or layout engines.
//!
//! | Plot | Function | Input |
//! |---|---|---|
//! | Forest | [`forest_plot`] | estimates + pooled result |
//! | Funnel | [`funnel_plot`], [`funnel_plot_with_fill`] | bias result + pooled or trim-and-fill result |
//! | Traffic light | [`traffic_light`] | caller-supplied risk-of-bias judgements |
//! | PRISMA | [`prisma_flow`] | selection counts |
//! | Network | [`network_plot`] | network analysis |
//! | Rankogram | [`ranking_chart`] | network analysis |
//! | League table | [`league_table`] | network analysis |

mod forest;
mod funnel;
mod network;
mod prisma;
mod traffic_light;

pub use forest::{forest_plot, ForestPlotData, ForestRow, RowKind};
pub use funnel::{funnel_plot, funnel_plot_with_fill, FunnelLimit, FunnelPlotData};
pub use network::{
    league_table, network_plot, ranking_chart, LeagueCell, LeagueTable, NetworkNode,
    NetworkPlotData, NetworkPlotEdge, RankingChartData, RankingSeries,
};
pub use prisma::{
    prisma_flow, PrismaCounts, PrismaExclusion, PrismaFlowData, PrismaPhase, PrismaStage,
};
pub use traffic_light::{
    traffic_light, DomainSummary, RiskJudgements, RiskLevel, StudyOverall, TrafficLightCell,
    TrafficLightData,
};

use serde::{Deserialize, Serialize};

/// Any plot record, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "plot_type", rename_all = "snake_case")]
pub enum PlotData {
    Forest(ForestPlotData),
    Funnel(FunnelPlotData),
    TrafficLight(TrafficLightData),
    Prisma(PrismaFlowData),
    Network(NetworkPlotData),
    Ranking(RankingChartData),
    League { tables: Vec<LeagueTable> },
}

impl PlotData {
    /// The serialized tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Forest(_) => "forest",
            Self::Funnel(_) => "funnel",
            Self::TrafficLight(_) => "traffic_light",
            Self::Prisma(_) => "prisma",
            Self::Network(_) => "network",
            Self::Ranking(_) => "ranking",
            Self::League { .. } => "league",
        }
    }
}
