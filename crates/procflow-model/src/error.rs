//! Errors raised by graph mutations

use crate::port::PortDirection;

/// Errors related to graph structure operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Port name not present and the group cannot grow it
    #[error("no {direction} port named '{name}'")]
    NoSuchPort {
        direction: PortDirection,
        name: String,
    },

    /// Port group no longer accepts new ports
    #[error("port group is locked, cannot create {direction} port '{name}'")]
    Locked {
        direction: PortDirection,
        name: String,
    },

    /// Port index out of range
    #[error("port index {0} out of range")]
    PortIndexOutOfRange(usize),

    /// Operator index out of range
    #[error("no operator at index {0}")]
    NoSuchOperator(usize),

    /// Execution unit index out of range
    #[error("no execution unit at index {0}")]
    NoSuchUnit(usize),

    /// Port already wired to a counterpart
    #[error("{direction} port '{name}' is already connected")]
    AlreadyConnected {
        direction: PortDirection,
        name: String,
    },
}

/// Result alias for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let err = GraphError::NoSuchPort {
            direction: PortDirection::Input,
            name: "in".to_string(),
        };
        assert_eq!(err.to_string(), "no input port named 'in'");

        let err = GraphError::AlreadyConnected {
            direction: PortDirection::Output,
            name: "out".to_string(),
        };
        assert_eq!(err.to_string(), "output port 'out' is already connected");
    }
}
