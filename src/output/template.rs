//! Envelope templates for the HTTP destination.
//!
//! An upload body is produced from three templates:
//!
//! - the **post template** lays out the whole request body and may reference
//!   `{{FileName}}`, `{{FileSize}}` and, at most once, `{{Events}}`;
//! - the **first event template** renders the first event;
//! - the **subsequent event template** renders every later event, which is
//!   where separators live (`"\n, {{.}}"` builds a JSON array).
//!
//! Event templates reference the event text as `{{.}}` or `{{EventText}}`.
//! A leading dot on any placeholder name is optional.

use std::io;

use anyhow::{Result, bail};
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;

use crate::config::HttpConfig;
use crate::models::{UploadData, UploadEvent};
use crate::output::pipe::PipeWriter;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
enum EnvelopeSegment {
    Literal(Bytes),
    FileName,
    FileSize,
    Events,
}

#[derive(Debug, Clone, PartialEq)]
enum FragmentSegment {
    Literal(String),
    EventText,
}

/// Split `source` into literal text and placeholder names.
fn tokenize(source: &str) -> Vec<(Option<&str>, &str)> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(source) {
        let whole = caps.get(0).unwrap();
        if whole.start() > last {
            tokens.push((None, &source[last..whole.start()]));
        }
        let name = caps.get(1).map_or("", |m| m.as_str());
        tokens.push((Some(name.strip_prefix('.').unwrap_or(name)), whole.as_str()));
        last = whole.end();
    }
    if last < source.len() {
        tokens.push((None, &source[last..]));
    }

    tokens
}

/// The outer template: fixed scaffolding around the event sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeTemplate {
    segments: Vec<EnvelopeSegment>,
}

impl EnvelopeTemplate {
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut seen_events = false;

        for (name, text) in tokenize(source) {
            let segment = match name {
                None => EnvelopeSegment::Literal(Bytes::copy_from_slice(text.as_bytes())),
                Some("FileName") => EnvelopeSegment::FileName,
                Some("FileSize") => EnvelopeSegment::FileSize,
                Some("Events") => {
                    if seen_events {
                        bail!("Post template references {{{{Events}}}} more than once");
                    }
                    seen_events = true;
                    EnvelopeSegment::Events
                },
                Some(other) => bail!("Unknown placeholder '{}' in post template", other),
            };
            segments.push(segment);
        }

        Ok(EnvelopeTemplate { segments })
    }

    pub fn has_events(&self) -> bool {
        self.segments.contains(&EnvelopeSegment::Events)
    }
}

/// Template for a single event fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentTemplate {
    segments: Vec<FragmentSegment>,
}

impl FragmentTemplate {
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();

        for (name, text) in tokenize(source) {
            let segment = match name {
                None => FragmentSegment::Literal(text.to_string()),
                Some("") | Some("EventText") => FragmentSegment::EventText,
                Some(other) => bail!("Unknown placeholder '{}' in event template", other),
            };
            segments.push(segment);
        }

        Ok(FragmentTemplate { segments })
    }

    pub fn render(&self, event: &UploadEvent) -> String {
        let mut rendered = String::with_capacity(event.event_text.len() + 8);
        for segment in &self.segments {
            match segment {
                FragmentSegment::Literal(text) => rendered.push_str(text),
                FragmentSegment::EventText => rendered.push_str(&event.event_text),
            }
        }
        rendered
    }
}

/// Counters reported once an envelope has been written out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub events: usize,
    pub bytes: u64,
}

/// The complete template set used by one HTTP destination.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTemplates {
    pub envelope: EnvelopeTemplate,
    pub first_event: FragmentTemplate,
    pub subsequent_event: FragmentTemplate,
}

impl EventTemplates {
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Ok(EventTemplates {
            envelope: EnvelopeTemplate::parse(&config.post_template)?,
            first_event: FragmentTemplate::parse(&config.first_event_template)?,
            subsequent_event: FragmentTemplate::parse(&config.subsequent_event_template)?,
        })
    }

    /// Render the envelope for `data` into `out`, pulling events off the
    /// queue as the events placeholder is reached.
    ///
    /// A read error carried by the queue is returned as-is; a closed pipe
    /// shows up as `BrokenPipe`.
    pub async fn render(&self, mut data: UploadData, out: &PipeWriter) -> io::Result<RenderSummary> {
        let mut summary = RenderSummary::default();

        for segment in &self.envelope.segments {
            match segment {
                EnvelopeSegment::Literal(text) => {
                    summary.bytes += out.write(text.clone()).await? as u64;
                },
                EnvelopeSegment::FileName => {
                    summary.bytes += out.write(data.file_name.clone()).await? as u64;
                },
                EnvelopeSegment::FileSize => {
                    summary.bytes += out.write(data.file_size.to_string()).await? as u64;
                },
                EnvelopeSegment::Events => {
                    while let Some(item) = data.events.recv().await {
                        let event = item?;
                        let template = if summary.events == 0 {
                            &self.first_event
                        } else {
                            &self.subsequent_event
                        };
                        summary.bytes += out.write(template.render(&event)).await? as u64;
                        summary.events += 1;
                    }
                },
            }
        }

        Ok(summary)
    }
}
