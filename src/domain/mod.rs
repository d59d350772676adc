//! Billing domain entities.
//! Framework-agnostic representation of students, fee schedules and payments.

pub mod fee;
pub mod payment;
pub mod student;

pub use fee::{FeeComponents, FeeSchedule};
pub use payment::{
    is_payment_confirmed, GatewayAction, GatewayCorrelation, InstructionColumns, PaymentInstruction,
    PaymentMethod, PaymentRecord, PaymentStatus, TransitionError,
};
pub use student::{Student, StudentSummary};
