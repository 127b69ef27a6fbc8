use crate::core::consensus::calibration::CalibrationError;
use crate::core::io::store::StoreError;
use crate::core::io::tables::TableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Result store error: {source}")]
    Store {
        #[from]
        source: StoreError,
    },

    #[error("Calibration error: {source}")]
    Calibration {
        #[from]
        source: CalibrationError,
    },

    #[error("Table error: {source}")]
    Table {
        #[from]
        source: TableError,
    },
}
