//! Boundary to the OneKey hardware SDK.

pub mod bridge;
pub mod events;
pub mod instance;
pub mod sdk;
pub mod service;

pub use bridge::{RequestSink, SdkBridge, SdkEnvelope, SdkRequest};
pub use events::{ProgressPhase, StageTip, UiEvent};
pub use instance::SdkHandle;
pub use sdk::{
    BootloaderReleaseInfo, BridgeReleaseInfo, FirmwareUpdateV2Params, FirmwareUpdateV3Params, HardwareError,
    HardwareSdk, Platform, SdkFailure, SdkResponse, SdkResult, SdkSettings, SearchDevice, UiResponse,
    PAYLOAD_TOO_LARGE, PIN_ON_DEVICE,
};
pub use service::{HardwareService, SearchOutcome};
