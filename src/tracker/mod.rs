// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cross-chain transaction state: message lifecycle records, the
//! persistent store they live in, and the tracker that advances them
//! from observed chain events.

mod store;
mod tracker;
mod types;

pub use store::{FileStorage, MemoryStorage, Storage, XTransactionStore};
pub use tracker::{new_transaction, MessageTracker};
pub use types::{
    SourceTransaction, XMessage, XMessageStatus, XTransaction, XTransactionStatusUpdate,
};
