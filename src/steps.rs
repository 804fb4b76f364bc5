//! One builder per TauDEM stage.
//!
//! Each builder fixes its tool's flag order and file roles; paths come from
//! [`crate::args`]. Builders are pure, running them is the orchestrator's job.
use crate::args::{file_arg, outlet_arg, ArgToken, SHAPE_EXT};
use crate::exec::StepInvocation;
use crate::orchestrator::PipelineError;
use crate::session::Session;
use std::fmt;

/// Basename under which snapped outlets are always written.
pub const SNAPPED_OUTLET: &str = "Outlet";

/// Basename of the stream network shapefile.
pub const STREAM_NETWORK: &str = "River";

/// A pipeline stage. Stage names appear in failure messages; several stages
/// may share one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Stage {
    #[value(name = "pitremove")]
    PitRemove,
    #[value(name = "d8flowdir")]
    D8FlowDir,
    #[value(name = "dinfflowdir")]
    DinfFlowDir,
    #[value(name = "aread8")]
    AreaD8,
    #[value(name = "areadinf")]
    AreaDinf,
    #[value(name = "gridnet")]
    GridNet,
    #[value(name = "peukerdouglas")]
    PeukerDouglas,
    #[value(name = "aread8_outlets")]
    AreaD8Outlets,
    #[value(name = "gagewatershed")]
    GageWatershed,
    #[value(name = "moveoutletstostreams")]
    MoveOutletsToStreams,
    #[value(name = "dropanalysis")]
    DropAnalysis,
    #[value(name = "threshold")]
    Threshold,
    #[value(name = "streamnet")]
    StreamNet,
    #[value(name = "connectdown")]
    ConnectDown,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Self::PitRemove => "pitremove",
            Self::D8FlowDir => "d8flowdir",
            Self::DinfFlowDir => "dinfflowdir",
            Self::AreaD8 => "aread8",
            Self::AreaDinf => "areadinf",
            Self::GridNet => "gridnet",
            Self::PeukerDouglas => "peukerdouglas",
            Self::AreaD8Outlets => "aread8_outlets",
            Self::GageWatershed => "gagewatershed",
            Self::MoveOutletsToStreams => "moveoutletstostreams",
            Self::DropAnalysis => "dropanalysis",
            Self::Threshold => "threshold",
            Self::StreamNet => "streamnet",
            Self::ConnectDown => "connectdown",
        }
    }

    /// Executable invoked for this stage.
    pub fn tool(self) -> &'static str {
        match self {
            Self::AreaD8Outlets => "aread8",
            other => other.name(),
        }
    }

    /// Build the invocation for this stage from per-run parameters.
    pub fn invocation(
        self,
        session: &Session,
        params: &StageParams,
    ) -> Result<StepInvocation, PipelineError> {
        let outlet = params.outlet.as_deref();
        Ok(match self {
            Self::PitRemove => pitremove(session),
            Self::D8FlowDir => d8flowdir(session),
            Self::DinfFlowDir => dinfflowdir(session),
            Self::AreaD8 => aread8(session),
            Self::AreaDinf => areadinf(session),
            Self::GridNet => gridnet(session),
            Self::PeukerDouglas => peukerdouglas(session),
            Self::AreaD8Outlets => aread8_outlets(session, outlet),
            Self::GageWatershed => gagewatershed(session, outlet),
            Self::MoveOutletsToStreams => {
                let outlet = outlet.ok_or(PipelineError::MissingParameter {
                    stage: self,
                    parameter: "outlet",
                })?;
                moveoutletstostreams(session, outlet, params.max_move_distance)?
            }
            Self::DropAnalysis => dropanalysis(session),
            Self::Threshold => {
                let value = params.threshold.ok_or(PipelineError::MissingParameter {
                    stage: self,
                    parameter: "threshold",
                })?;
                threshold(session, value)
            }
            Self::StreamNet => streamnet(session, outlet),
            Self::ConnectDown => connectdown(session, params.max_move_distance),
        })
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-run values some stages need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageParams {
    /// Contributing-area threshold for stream definition.
    pub threshold: Option<f64>,
    /// Outlet shapefile basename inside the project directory.
    pub outlet: Option<String>,
    /// Maximum distance, in cells, an outlet may be moved.
    pub max_move_distance: Option<u32>,
}

pub fn pitremove(session: &Session) -> StepInvocation {
    StepInvocation::new(Stage::PitRemove.tool())
        .arg(file_arg(session, "z").suffix("").build())
        .arg(file_arg(session, "fel").build())
}

pub fn d8flowdir(session: &Session) -> StepInvocation {
    StepInvocation::new(Stage::D8FlowDir.tool())
        .arg(file_arg(session, "fel").build())
        .arg(file_arg(session, "p").build())
        .arg(file_arg(session, "sd8").build())
}

pub fn dinfflowdir(session: &Session) -> StepInvocation {
    StepInvocation::new(Stage::DinfFlowDir.tool())
        .arg(file_arg(session, "fel").build())
        .arg(file_arg(session, "ang").build())
        .arg(file_arg(session, "slp").build())
}

pub fn aread8(session: &Session) -> StepInvocation {
    StepInvocation::new(Stage::AreaD8.tool())
        .arg(file_arg(session, "p").build())
        .arg(file_arg(session, "ad8").build())
        .arg(ArgToken::switch("nc"))
}

/// Accumulation of the Peuker-Douglas skeleton, restricted to the outlet's
/// catchment when an outlet is given.
pub fn aread8_outlets(session: &Session, outlet: Option<&str>) -> StepInvocation {
    StepInvocation::new(Stage::AreaD8Outlets.tool())
        .opt_arg(outlet_arg(session, outlet))
        .arg(file_arg(session, "p").build())
        .arg(file_arg(session, "wg").suffix("ss").build())
        .arg(file_arg(session, "ad8").suffix("ssa").build())
        .arg(ArgToken::switch("nc"))
}

pub fn areadinf(session: &Session) -> StepInvocation {
    StepInvocation::new(Stage::AreaDinf.tool())
        .arg(file_arg(session, "ang").build())
        .arg(file_arg(session, "sca").build())
        .arg(ArgToken::switch("nc"))
}

pub fn gridnet(session: &Session) -> StepInvocation {
    StepInvocation::new(Stage::GridNet.tool())
        .arg(file_arg(session, "p").build())
        .arg(file_arg(session, "plen").build())
        .arg(file_arg(session, "tlen").build())
        .arg(file_arg(session, "gord").build())
}

pub fn peukerdouglas(session: &Session) -> StepInvocation {
    StepInvocation::new(Stage::PeukerDouglas.tool())
        .arg(file_arg(session, "fel").build())
        .arg(file_arg(session, "ss").build())
}

pub fn gagewatershed(session: &Session, outlet: Option<&str>) -> StepInvocation {
    StepInvocation::new(Stage::GageWatershed.tool())
        .arg(file_arg(session, "p").build())
        .opt_arg(outlet_arg(session, outlet))
        .arg(file_arg(session, "gw").build())
}

/// Snap `outlet` onto the stream raster, writing `Outlet.shp`.
///
/// An input already named `Outlet` would be overwritten by its own result and
/// is refused before anything runs.
pub fn moveoutletstostreams(
    session: &Session,
    outlet: &str,
    max_move_distance: Option<u32>,
) -> Result<StepInvocation, PipelineError> {
    if outlet == SNAPPED_OUTLET {
        return Err(PipelineError::ReservedOutletName);
    }
    Ok(StepInvocation::new(Stage::MoveOutletsToStreams.tool())
        .arg(file_arg(session, "p").build())
        .arg(file_arg(session, "src").build())
        .opt_arg(outlet_arg(session, Some(outlet)))
        .arg(
            file_arg(session, "om")
                .suffix("")
                .ext(SHAPE_EXT)
                .basename(SNAPPED_OUTLET)
                .build(),
        )
        .opt_arg(max_move_distance.map(|cells| ArgToken::literal("md", cells))))
}

/// Drop analysis always runs against the snapped outlet.
pub fn dropanalysis(session: &Session) -> StepInvocation {
    StepInvocation::new(Stage::DropAnalysis.tool())
        .opt_arg(outlet_arg(session, Some(SNAPPED_OUTLET)))
        .arg(file_arg(session, "p").build())
        .arg(file_arg(session, "fel").build())
        .arg(file_arg(session, "ssa").build())
        .arg(file_arg(session, "ad8").build())
        .arg(file_arg(session, "drp").ext("txt").build())
}

pub fn threshold(session: &Session, value: f64) -> StepInvocation {
    StepInvocation::new(Stage::Threshold.tool())
        .arg(file_arg(session, "ssa").build())
        .arg(file_arg(session, "src").build())
        .arg(ArgToken::literal("thresh", value))
}

/// Stream network; without an outlet the whole basin is delineated.
pub fn streamnet(session: &Session, outlet: Option<&str>) -> StepInvocation {
    StepInvocation::new(Stage::StreamNet.tool())
        .arg(file_arg(session, "fel").build())
        .arg(file_arg(session, "p").build())
        .arg(file_arg(session, "ad8").build())
        .arg(file_arg(session, "src").build())
        .arg(file_arg(session, "ord").build())
        .arg(file_arg(session, "tree").ext("dat").build())
        .arg(file_arg(session, "coord").ext("dat").build())
        .opt_arg(outlet_arg(session, outlet))
        .arg(
            file_arg(session, "net")
                .suffix("")
                .ext(SHAPE_EXT)
                .basename(STREAM_NETWORK)
                .build(),
        )
        .arg(file_arg(session, "w").build())
}

/// Derive outlets from the watershed grid and connect each to its
/// downstream neighbour.
pub fn connectdown(session: &Session, move_distance: Option<u32>) -> StepInvocation {
    StepInvocation::new(Stage::ConnectDown.tool())
        .arg(file_arg(session, "p").build())
        .arg(file_arg(session, "ad8").build())
        .arg(file_arg(session, "w").build())
        .arg(file_arg(session, "o").ext(SHAPE_EXT).build())
        .arg(file_arg(session, "od").ext(SHAPE_EXT).build())
        .opt_arg(move_distance.map(|cells| ArgToken::literal("d", cells)))
}
