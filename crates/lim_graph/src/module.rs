//! Modules of the link graph.

use crate::ids::ConnectionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A separately compiled hardware module and its dangling interface.
///
/// Connections live in the graph's arena; the module keeps handles split by
/// family. Both lists are kept sorted by connection name (stable), which
/// fixes the matching order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LiModule {
    /// Unique module name.
    pub name: String,
    /// Free-form module class, e.g. `platform` or `user`.
    pub kind: String,
    /// Channel endpoints (`Send`/`Recv`).
    pub channels: Vec<ConnectionId>,
    /// Chain endpoints, routing endpoints included.
    pub chains: Vec<ConnectionId>,
    /// Arbitrary key/value attributes.
    pub attributes: BTreeMap<String, String>,
    /// Compiled artifacts by kind (e.g. `ngc`, `edf`), as paths.
    pub object_artifacts: BTreeMap<String, Vec<String>>,
}

impl LiModule {
    /// Creates an empty module.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Iterates over every connection handle, channels first.
    pub fn connection_ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.channels.iter().chain(self.chains.iter()).copied()
    }

    /// Records a compiled artifact under the given kind.
    pub fn add_artifact(&mut self, kind: impl Into<String>, path: impl Into<String>) {
        self.object_artifacts
            .entry(kind.into())
            .or_default()
            .push(path.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_ids_channels_first() {
        let mut m = LiModule::new("a", "user");
        m.channels.push(ConnectionId::from_raw(2));
        m.chains.push(ConnectionId::from_raw(0));
        m.channels.push(ConnectionId::from_raw(1));
        let ids: Vec<u32> = m.connection_ids().map(|c| c.as_raw()).collect();
        assert_eq!(ids, vec![2, 1, 0]);
    }

    #[test]
    fn artifacts_accumulate_per_kind() {
        let mut m = LiModule::new("a", "user");
        m.add_artifact("ngc", "a.ngc");
        m.add_artifact("ngc", "a_stub.ngc");
        assert_eq!(m.object_artifacts["ngc"].len(), 2);
    }
}
