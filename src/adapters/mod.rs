//! Storage adapters implementing the repository ports.

pub mod in_memory;
pub mod postgres_fee_schedule_repository;
pub mod postgres_payment_repository;
pub mod postgres_student_repository;

pub use in_memory::{InMemoryFeeScheduleRepository, InMemoryPaymentRepository, InMemoryStudentRepository};
pub use postgres_fee_schedule_repository::PostgresFeeScheduleRepository;
pub use postgres_payment_repository::PostgresPaymentRepository;
pub use postgres_student_repository::PostgresStudentRepository;
