// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! `vlaude [run]` — launch the assistant with remote takeover support.

use anyhow::Context;
use vlaude_core::SessionId;

use crate::driver::Driver;

pub async fn run(session: Option<String>) -> anyhow::Result<i32> {
    let real_path = std::env::current_dir().context("resolving project directory")?;
    let driver = Driver::new(real_path, session.map(SessionId::new))?;
    driver.run().await
}
