//! Bridge installer links per host platform.

use serde::{Deserialize, Serialize};

use super::config::BridgeRelease;

/// Host platforms the bridge ships installers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BridgeSystem {
    Linux64Deb,
    Linux64Rpm,
    Linux32Deb,
    Linux32Rpm,
    Mac,
    Win,
}

impl BridgeSystem {
    pub const ALL: [BridgeSystem; 6] = [
        BridgeSystem::Linux64Deb,
        BridgeSystem::Linux64Rpm,
        BridgeSystem::Linux32Deb,
        BridgeSystem::Linux32Rpm,
        BridgeSystem::Mac,
        BridgeSystem::Win,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BridgeSystem::Linux64Deb => "Linux 64-bit (deb)",
            BridgeSystem::Linux64Rpm => "Linux 64-bit (rpm)",
            BridgeSystem::Linux32Deb => "Linux 32-bit (deb)",
            BridgeSystem::Linux32Rpm => "Linux 32-bit (rpm)",
            BridgeSystem::Mac => "Mac OS X",
            BridgeSystem::Win => "Window",
        }
    }

    /// Installer flavour for the machine we run on. Unrecognized hosts get
    /// the Windows installer.
    pub fn current() -> Self {
        Self::for_os(std::env::consts::OS)
    }

    fn for_os(os: &str) -> Self {
        match os {
            "macos" => BridgeSystem::Mac,
            "linux" => BridgeSystem::Linux64Deb,
            _ => BridgeSystem::Win,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeLink {
    pub system: BridgeSystem,
    pub label: String,
    pub value: String,
}

/// Labelled download links derived from the bridge section of the config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeReleaseMap {
    pub links: Vec<BridgeLink>,
}

impl BridgeReleaseMap {
    pub fn from_release(release: &BridgeRelease) -> Self {
        let links = BridgeSystem::ALL
            .into_iter()
            .map(|system| {
                let url = match system {
                    BridgeSystem::Linux64Deb => &release.linux64_deb,
                    BridgeSystem::Linux64Rpm => &release.linux64_rpm,
                    BridgeSystem::Linux32Deb => &release.linux32_deb,
                    BridgeSystem::Linux32Rpm => &release.linux32_rpm,
                    BridgeSystem::Mac => &release.mac,
                    BridgeSystem::Win => &release.win,
                };
                BridgeLink {
                    system,
                    label: system.label().to_string(),
                    value: url.clone(),
                }
            })
            .collect();
        Self { links }
    }

    pub fn get(&self, system: BridgeSystem) -> Option<&BridgeLink> {
        self.links.iter().find(|l| l.system == system)
    }

    pub fn for_current_platform(&self) -> Option<&BridgeLink> {
        self.get(BridgeSystem::current())
    }
}
