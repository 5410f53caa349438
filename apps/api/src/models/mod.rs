pub mod aggregate;
pub mod applicant;
pub mod enrichment;
pub mod ranking;
