use std::io::{self, Write};

use crate::grammar::{ProductionId, SymbolId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceAction {
    Shift,
    Reduce(ProductionId),
    Accept,
    Reject,
}

/// One parser action, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    /// The current input symbol when the action was taken.
    pub symbol: SymbolId,
    pub text: String,
    pub action: TraceAction,
    /// Stack size after the action.
    pub stack_depth: usize,
}

pub trait TraceSink {
    fn record(&mut self, event: &TraceEvent);
}

impl TraceSink for Vec<TraceEvent> {
    fn record(&mut self, event: &TraceEvent) {
        self.push(event.clone());
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn record(&mut self, _event: &TraceEvent) {}
}

/// Writes a text trace: one line per input token, with its reduces and the
/// final shift appended, e.g. `1   id              [reduce 3][shift]`.
pub struct WriterSink<W: Write> {
    writer: W,
    line_open: bool,
    // first write failure; later events are dropped
    error: Option<io::Error>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> WriterSink<W> {
        WriterSink {
            writer,
            line_open: false,
            error: None,
        }
    }

    /// Returns the writer, or the first error hit while writing.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_event(&mut self, event: &TraceEvent) -> io::Result<()> {
        match event.action {
            TraceAction::Shift | TraceAction::Reduce(_) => {
                if !self.line_open {
                    write!(self.writer, "{:<3} {:<16}", event.symbol, event.text)?;
                    self.line_open = true;
                }
            }
            TraceAction::Accept | TraceAction::Reject => {
                if self.line_open {
                    writeln!(self.writer)?;
                    self.line_open = false;
                }
            }
        }

        match event.action {
            TraceAction::Shift => {
                writeln!(self.writer, "[shift]")?;
                self.line_open = false;
            }
            TraceAction::Reduce(production) => write!(self.writer, "[reduce {}]", production)?,
            TraceAction::Accept => writeln!(self.writer, "[accept]")?,
            TraceAction::Reject => writeln!(self.writer, "[reject]")?,
        }
        Ok(())
    }
}

impl<W: Write> TraceSink for WriterSink<W> {
    fn record(&mut self, event: &TraceEvent) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.write_event(event) {
            self.error = Some(err);
        }
    }
}
