pub mod json_store;
pub mod memory_store;
pub mod mock_ledger;
pub mod mock_prover;
