pub mod error;
pub mod expand;
pub mod id;
pub mod lint;
pub mod model;
pub mod params;
pub mod path;
pub mod scene;
pub mod snapshot;

pub use error::{ExpansionError, SnapshotError, SnapshotResult};
pub use expand::{ExpandConfig, expand, expand_with};
pub use id::NodeId;
pub use lint::{LintDiagnostic, LintSeverity, lint_document};
pub use model::*;
pub use params::{
    BindingTarget, ComponentParamDef, LayoutField, ParamBinding, ParamType, ParamValue, PropField,
    StyleField,
};
pub use path::{ExpandPath, PathSegment};
pub use scene::{
    ExpandedId, ExpandedNode, ExpandedNodeOrigin, ExpandedScene, OriginKind, Placeholder,
    SlotOrigin,
};
