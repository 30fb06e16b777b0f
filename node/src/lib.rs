// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod api;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod lifecycle;
pub mod server;
pub mod telemetry;
