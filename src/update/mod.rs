//! Update sessions: selection, sequencing and progress.

pub mod messages;
pub mod progress;
pub mod selection;
pub mod sequencer;
pub mod session;

pub use progress::{ProgressState, StageLabel};
pub use selection::{ComponentSource, LocalFileInfo, LocalFirmware, UpdateSelection, UpdateSource, V3Selections, V3Tab};
pub use sequencer::{RejectReason, SequencerConfig, UpdateOutcome, UpdateSequencer};
pub use session::{InstallType, SessionState, UpdatePhase, UpdateSession};
