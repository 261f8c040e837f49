pub mod flooding;
pub mod lsdb;
pub mod neighbor;
pub mod routing_table;
pub mod task_manager;

pub use flooding::*;
pub use lsdb::*;
pub use neighbor::*;
pub use routing_table::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// IS-IS circuit level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    L1,
    L2,
    L1L2,
}

impl Level {
    /// Two circuits can form an adjacency if either runs both levels or
    /// both run the same single level.
    pub fn compatible_with(self, other: Level) -> bool {
        self == Level::L1L2 || other == Level::L1L2 || self == other
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::L1 => "L1",
            Level::L2 => "L2",
            Level::L1L2 => "L1L2",
        };
        f.write_str(s)
    }
}

/// Which adjacency procedure a router runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Protocol {
    /// Single-level, OSPF-style: Init -> TwoWay -> ExStart -> Exchange -> Full.
    #[default]
    Ospf,
    /// Two-level, IS-IS-style: Init -> Up, gated on level compatibility.
    Isis { level: Level },
}

const OSPF_PROGRESSION: &[NeighborState] = &[
    NeighborState::TwoWay,
    NeighborState::ExStart,
    NeighborState::Exchange,
    NeighborState::Full,
];

const ISIS_PROGRESSION: &[NeighborState] = &[NeighborState::Up];

impl Protocol {
    pub fn level(&self) -> Option<Level> {
        match self {
            Protocol::Ospf => None,
            Protocol::Isis { level } => Some(*level),
        }
    }

    /// States walked through after `Init`, ending in the terminal state.
    pub fn progression(&self) -> &'static [NeighborState] {
        match self {
            Protocol::Ospf => OSPF_PROGRESSION,
            Protocol::Isis { .. } => ISIS_PROGRESSION,
        }
    }

    pub fn terminal_state(&self) -> NeighborState {
        match self {
            Protocol::Ospf => NeighborState::Full,
            Protocol::Isis { .. } => NeighborState::Up,
        }
    }

    /// Level check for leaving `Init`. A hello without a level counts as L1.
    pub fn admits(&self, remote: Option<Level>) -> Result<(), LevelMismatch> {
        match self {
            Protocol::Ospf => Ok(()),
            Protocol::Isis { level } => {
                let remote = remote.unwrap_or(Level::L1);
                if level.compatible_with(remote) {
                    Ok(())
                } else {
                    Err(LevelMismatch { local: *level, remote })
                }
            }
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Ospf => f.write_str("OSPF"),
            Protocol::Isis { level } => write!(f, "IS-IS {}", level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_compatibility() {
        assert!(Level::L1.compatible_with(Level::L1));
        assert!(Level::L2.compatible_with(Level::L2));
        assert!(Level::L1.compatible_with(Level::L1L2));
        assert!(Level::L1L2.compatible_with(Level::L2));
        assert!(!Level::L1.compatible_with(Level::L2));
        assert!(!Level::L2.compatible_with(Level::L1));
    }

    #[test]
    fn ospf_admits_anything() {
        assert!(Protocol::Ospf.admits(None).is_ok());
        assert!(Protocol::Ospf.admits(Some(Level::L2)).is_ok());
    }

    #[test]
    fn isis_defaults_missing_level_to_l1() {
        let l2 = Protocol::Isis { level: Level::L2 };
        assert_eq!(
            l2.admits(None),
            Err(LevelMismatch { local: Level::L2, remote: Level::L1 })
        );
        assert!(Protocol::Isis { level: Level::L1 }.admits(None).is_ok());
    }

    #[test]
    fn progressions_end_in_terminal_state() {
        for protocol in [Protocol::Ospf, Protocol::Isis { level: Level::L1 }] {
            assert_eq!(protocol.progression().last(), Some(&protocol.terminal_state()));
            assert!(protocol.terminal_state().is_terminal());
        }
    }

    #[test]
    fn protocol_serde_shape() {
        let json = serde_json::to_string(&Protocol::Isis { level: Level::L1L2 }).unwrap();
        assert_eq!(json, r#"{"kind":"isis","level":"L1L2"}"#);
        let ospf: Protocol = serde_json::from_str(r#"{"kind":"ospf"}"#).unwrap();
        assert_eq!(ospf, Protocol::Ospf);
    }
}
