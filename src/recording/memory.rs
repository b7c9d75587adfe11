//! In-memory recording database.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

use super::{MessageDatabase, Recorder, RecordingStream};
use crate::message::FieldValue;
use crate::types::{Result, StreamId, TransactionId};

/// A closed transaction.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub stream: StreamId,
    pub name: String,
    pub type_name: String,
    pub opened_at: DateTime<Utc>,
    pub fields: Vec<(String, FieldValue)>,
}

/// Stream held by a [`MemoryDatabase`].
#[derive(Debug)]
pub struct MemoryStream {
    pub id: StreamId,
    pub name: String,
    pub scope: String,
    pub kind: String,
    transactions: Arc<Mutex<Vec<Transaction>>>,
}

impl MemoryStream {
    /// Transactions released on this stream, in release order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RecordingStream for MemoryStream {
    fn open_recorder(&self, name: &str, type_name: &str) -> Option<Box<dyn Recorder>> {
        Some(Box::new(MemoryRecorder {
            sink: self.transactions.clone(),
            transaction: Transaction {
                id: TransactionId::new(),
                stream: self.id.clone(),
                name: name.to_string(),
                type_name: type_name.to_string(),
                opened_at: Utc::now(),
                fields: Vec::new(),
            },
        }))
    }
}

struct MemoryRecorder {
    sink: Arc<Mutex<Vec<Transaction>>>,
    transaction: Transaction,
}

impl Recorder for MemoryRecorder {
    fn record_field(&mut self, name: &str, value: FieldValue) {
        self.transaction.fields.push((name.to_string(), value));
    }

    fn release(self: Box<Self>) {
        let MemoryRecorder { sink, transaction } = *self;
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transaction);
    }
}

/// Recording database keeping every stream and transaction in memory.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    streams: Mutex<Vec<Arc<MemoryStream>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn streams(&self) -> Vec<Arc<MemoryStream>> {
        self.streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn stream_count(&self) -> usize {
        self.streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// All released transactions, stream by stream.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.streams()
            .iter()
            .flat_map(|stream| stream.transactions())
            .collect()
    }

    /// Export all transactions as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.transactions())?)
    }
}

impl MessageDatabase for MemoryDatabase {
    fn open_stream(&self, name: &str, scope: &str, kind: &str) -> Option<Arc<dyn RecordingStream>> {
        let stream = Arc::new(MemoryStream {
            id: StreamId::new(),
            name: name.to_string(),
            scope: scope.to_string(),
            kind: kind.to_string(),
            transactions: Arc::new(Mutex::new(Vec::new())),
        });
        self.streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(stream.clone());
        Some(stream)
    }
}
