use std::sync::Arc;

use crate::{
    config::Config,
    services::{
        delivery::{LogDelivery, PasswordDelivery},
        receipts::{CommandParser, ParseJobs, ReceiptParser, UnconfiguredParser},
        reviews::ReviewFeed,
    },
    store::{MemoryStore, Store},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub reviews: ReviewFeed,
    pub parse_jobs: ParseJobs,
    pub parser: Arc<dyn ReceiptParser>,
    pub password_delivery: Arc<dyn PasswordDelivery>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        let parser: Arc<dyn ReceiptParser> = match &config.receipt_parser {
            Some(command) => Arc::new(CommandParser::new(command.clone())),
            None => Arc::new(UnconfiguredParser),
        };

        Self {
            config: Arc::new(config),
            store,
            reviews: ReviewFeed::default(),
            parse_jobs: ParseJobs::default(),
            parser,
            password_delivery: Arc::new(LogDelivery),
        }
    }

    pub fn in_memory(config: Config) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_parser(mut self, parser: Arc<dyn ReceiptParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_password_delivery(mut self, delivery: Arc<dyn PasswordDelivery>) -> Self {
        self.password_delivery = delivery;
        self
    }
}
