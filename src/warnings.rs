// src/warnings.rs

use crate::{symbols, ui};
use colored::*;
use std::{collections::VecDeque, sync::Mutex};

#[derive(Default)]
struct WarningBuffer {
    entries: VecDeque<String>,
    omitted: usize,
}

/// 爬取过程中的警告先缓存起来，结束时统一输出。只保留最近的 `limit` 条。
pub struct WarningLog {
    buffer: Mutex<WarningBuffer>,
    limit: usize,
}

impl WarningLog {
    pub fn new(limit: usize) -> Self {
        Self {
            buffer: Mutex::new(WarningBuffer::default()),
            limit,
        }
    }

    pub fn push(&self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        let mut buffer = self.buffer.lock().unwrap();
        buffer.entries.push_back(message);
        while buffer.entries.len() > self.limit {
            buffer.entries.pop_front();
            buffer.omitted += 1;
        }
    }

    /// (保留的警告, 被省略的条数)
    pub fn snapshot(&self) -> (Vec<String>, usize) {
        let buffer = self.buffer.lock().unwrap();
        (buffer.entries.iter().cloned().collect(), buffer.omitted)
    }

    pub fn total(&self) -> usize {
        let buffer = self.buffer.lock().unwrap();
        buffer.entries.len() + buffer.omitted
    }

    pub fn print_report(&self) {
        let (entries, omitted) = self.snapshot();
        if entries.is_empty() && omitted == 0 {
            return;
        }
        ui::print_sub_header("警告汇总");
        if omitted > 0 {
            println!(
                "{} {}",
                *symbols::INFO,
                format!("另有 {} 条较早的警告已省略，详见日志文件。", omitted).dimmed()
            );
        }
        for entry in &entries {
            println!("{} {}", *symbols::WARN, entry.yellow());
        }
    }
}
