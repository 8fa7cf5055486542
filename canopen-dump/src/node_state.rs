//! Per-node decode state
//!
//! One record per CANopen node id (1..=127), created up front and never
//! dropped while the dumper lives.

/// Highest valid CANopen node id
pub const MAX_NODE_ID: u8 = 127;

/// Upper bound on the buffer space reserved from an announced transfer size
pub const MAX_PRESIZE: usize = 4096;

/// Decode state remembered for one node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeState {
    /// Multiplexer of the open segmented SDO transfer, 0 when idle
    pub current_mux: u32,
    /// Bytes received so far in the open segmented transfer
    pub sdo_data: Vec<u8>,
    /// Value of object 0x1000/0, 0 until observed
    pub device_type: u32,
}

impl NodeState {
    pub fn is_transfer_open(&self) -> bool {
        self.current_mux != 0
    }

    /// Start a segmented transfer for `mux`, dropping any previous data
    pub fn open_transfer(&mut self, mux: u32, announced_size: Option<usize>) {
        self.current_mux = mux;
        self.sdo_data.clear();
        if let Some(size) = announced_size {
            self.sdo_data.reserve(size.min(MAX_PRESIZE));
        }
    }

    /// Mark the transfer as finished; collected data stays until the next open
    pub fn close_transfer(&mut self) {
        self.current_mux = 0;
    }
}

/// Fixed-size table of node states indexed by node id
#[derive(Debug, Clone)]
pub struct NodeStateTable {
    nodes: [NodeState; MAX_NODE_ID as usize],
}

impl NodeStateTable {
    pub fn new() -> Self {
        Self {
            nodes: std::array::from_fn(|_| NodeState::default()),
        }
    }

    /// State of `node_id`, `None` for the broadcast id 0 and ids above 127
    pub fn get(&self, node_id: u8) -> Option<&NodeState> {
        Self::slot(node_id).map(|i| &self.nodes[i])
    }

    pub fn get_mut(&mut self, node_id: u8) -> Option<&mut NodeState> {
        Self::slot(node_id).map(move |i| &mut self.nodes[i])
    }

    fn slot(node_id: u8) -> Option<usize> {
        (1..=MAX_NODE_ID)
            .contains(&node_id)
            .then(|| node_id as usize - 1)
    }
}

impl Default for NodeStateTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_bounds() {
        let mut table = NodeStateTable::new();
        assert!(table.get(0).is_none());
        assert!(table.get_mut(128).is_none());
        assert!(table.get(1).is_some());
        assert!(table.get(127).is_some());
    }

    #[test]
    fn test_initial_state() {
        let table = NodeStateTable::new();
        for id in 1..=MAX_NODE_ID {
            assert_eq!(table.get(id), Some(&NodeState::default()));
        }
    }

    #[test]
    fn test_transfer_lifecycle() {
        let mut state = NodeState::default();
        state.sdo_data.extend_from_slice(b"stale");

        state.open_transfer(0x100800, Some(16));
        assert!(state.is_transfer_open());
        assert!(state.sdo_data.is_empty());
        assert!(state.sdo_data.capacity() >= 16);

        state.sdo_data.extend_from_slice(b"abc");
        state.close_transfer();
        assert!(!state.is_transfer_open());
        assert_eq!(state.sdo_data, b"abc");
    }

    #[test]
    fn test_announced_size_reservation_is_capped() {
        let mut state = NodeState::default();
        state.open_transfer(0x200000, Some(u32::MAX as usize));
        assert!(state.is_transfer_open());
        assert!(state.sdo_data.capacity() <= 2 * MAX_PRESIZE);
    }

    #[test]
    fn test_nodes_are_independent() {
        let mut table = NodeStateTable::new();
        if let Some(state) = table.get_mut(3) {
            state.open_transfer(0x200001, None);
            state.sdo_data.push(0xAA);
            state.device_type = 402;
        }

        for id in (1..=MAX_NODE_ID).filter(|&id| id != 3) {
            assert_eq!(table.get(id), Some(&NodeState::default()));
        }
    }
}
