use crate::orders::OrderStatus;

/// Service for managing order status transitions
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a status transition is valid
    ///
    /// # Valid Transitions
    /// - Pending → Confirmed, Cancelled
    /// - Confirmed → Processing, Cancelled
    /// - Processing → Shipped
    /// - Shipped → Delivered
    /// - Delivered → (terminal)
    /// - Cancelled → (terminal)
    ///
    /// Cancellation is only possible before fulfilment starts; once an
    /// order is processing, it ships.
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        matches!(
            (from, to),
            (OrderStatus::Pending, OrderStatus::Confirmed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Confirmed, OrderStatus::Processing)
                | (OrderStatus::Confirmed, OrderStatus::Cancelled)
                | (OrderStatus::Processing, OrderStatus::Shipped)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
        )
    }

    /// Attempt to transition from one status to another
    ///
    /// # Returns
    /// `Ok(to)` if the transition is valid, `Err(message)` otherwise
    pub fn transition(from: OrderStatus, to: OrderStatus) -> Result<OrderStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid status transition from {} to {}", from, to))
        }
    }

    /// Whether an order in this status may still be cancelled
    pub fn can_cancel(status: OrderStatus) -> bool {
        Self::is_valid_transition(status, OrderStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_to_confirmed() {
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Confirmed
        ));
    }

    #[test]
    fn test_pending_to_cancelled() {
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Cancelled
        ));
    }

    #[test]
    fn test_confirmed_to_processing() {
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Confirmed,
            OrderStatus::Processing
        ));
    }

    #[test]
    fn test_confirmed_to_cancelled() {
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Confirmed,
            OrderStatus::Cancelled
        ));
    }

    #[test]
    fn test_processing_to_shipped() {
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Processing,
            OrderStatus::Shipped
        ));
    }

    #[test]
    fn test_shipped_to_delivered() {
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Shipped,
            OrderStatus::Delivered
        ));
    }

    #[test]
    fn test_processing_cannot_cancel() {
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Processing,
            OrderStatus::Cancelled
        ));
    }

    #[test]
    fn test_shipped_cannot_cancel() {
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Shipped,
            OrderStatus::Cancelled
        ));
    }

    #[test]
    fn test_skip_transitions_rejected() {
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Processing
        ));
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Delivered
        ));
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Confirmed,
            OrderStatus::Shipped
        ));
    }

    #[test]
    fn test_backward_transitions_rejected() {
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Confirmed,
            OrderStatus::Pending
        ));
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Shipped,
            OrderStatus::Processing
        ));
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Delivered,
            OrderStatus::Shipped
        ));
    }

    #[test]
    fn test_transition_valid() {
        let result = StatusMachine::transition(OrderStatus::Pending, OrderStatus::Confirmed);
        assert_eq!(result, Ok(OrderStatus::Confirmed));
    }

    #[test]
    fn test_transition_invalid() {
        let result = StatusMachine::transition(OrderStatus::Pending, OrderStatus::Shipped);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Invalid status transition"));
    }

    #[test]
    fn test_can_cancel() {
        assert!(StatusMachine::can_cancel(OrderStatus::Pending));
        assert!(StatusMachine::can_cancel(OrderStatus::Confirmed));
        assert!(!StatusMachine::can_cancel(OrderStatus::Processing));
        assert!(!StatusMachine::can_cancel(OrderStatus::Shipped));
        assert!(!StatusMachine::can_cancel(OrderStatus::Delivered));
        assert!(!StatusMachine::can_cancel(OrderStatus::Cancelled));
    }
}
