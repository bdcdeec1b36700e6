use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TxSelect;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TxSelectOk;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TxCommit;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TxCommitOk;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TxRollback;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TxRollbackOk;
