// Little-endian binary layout:
//   magic: 8 bytes = "LRTBL001"
//   u32:   n_terminals, n_nonterminals, start
//   u32:   n_states, n_productions, shift entries, goto entries, words per lookahead row
//   u32:   shift-reduce conflicts, reduce-reduce conflicts
//   u32:   shift switch[n_states], shift entries[2 * shift entries]
//   u32:   goto switch[n_states], goto entries[2 * goto entries]
//   u32:   reduce[n_states]
//   u32:   lhs[n_productions], rhs_len[n_productions]
//   u64:   lookahead words[n_productions * words per row]

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use thiserror::Error;

use super::{CompactTables, LookaheadTable, ProductionTable, SegmentTable, NONE};

const MAGIC: &[u8; 8] = b"LRTBL001";

// upper bound on speculative allocation from header counts
const MAX_PREALLOC: usize = 1 << 16;

#[derive(Error, Debug)]
pub enum TableIoError {
    #[error("not a table file (bad magic)")]
    BadMagic,
    #[error("unexpected eof while reading tables")]
    Truncated,
    #[error("inconsistent tables: {0}")]
    Inconsistent(String),
    #[error(transparent)]
    Io(std::io::Error),
}

impl From<std::io::Error> for TableIoError {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            std::io::ErrorKind::UnexpectedEof => TableIoError::Truncated,
            _ => TableIoError::Io(value),
        }
    }
}

fn inconsistent<T>(message: impl Into<String>) -> Result<T, TableIoError> {
    Err(TableIoError::Inconsistent(message.into()))
}

fn write_u32s<W: Write>(w: &mut W, values: &[u32]) -> std::io::Result<()> {
    for value in values {
        w.write_u32::<LE>(*value)?;
    }
    Ok(())
}

fn read_u32s<R: Read>(r: &mut R, count: usize) -> std::io::Result<Vec<u32>> {
    let mut values = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        values.push(r.read_u32::<LE>()?);
    }
    Ok(values)
}

fn write_segments<W: Write>(w: &mut W, table: &SegmentTable) -> std::io::Result<()> {
    write_u32s(w, table.switch())?;
    for (symbol, next) in table.entries() {
        w.write_u32::<LE>(*symbol)?;
        w.write_u32::<LE>(*next)?;
    }
    Ok(())
}

fn read_segments<R: Read>(
    r: &mut R,
    n_states: usize,
    n_entries: usize,
) -> std::io::Result<SegmentTable> {
    let switch = read_u32s(r, n_states)?;
    let mut entries = Vec::with_capacity(n_entries.min(MAX_PREALLOC));
    for _ in 0..n_entries {
        let symbol = r.read_u32::<LE>()?;
        let next = r.read_u32::<LE>()?;
        entries.push((symbol, next));
    }
    Ok(SegmentTable::from_raw_parts(switch, entries))
}

impl CompactTables {
    pub fn write_bin<W: Write>(&self, w: &mut W) -> Result<(), TableIoError> {
        w.write_all(MAGIC)?;
        write_u32s(
            w,
            &[
                self.n_terminals,
                self.n_nonterminals,
                self.start,
                self.n_states() as u32,
                self.n_productions() as u32,
                self.shift.entries().len() as u32,
                self.goto.entries().len() as u32,
                self.lookahead.words_per_row,
                self.shift_reduce_conflicts,
                self.reduce_reduce_conflicts,
            ],
        )?;

        write_segments(w, &self.shift)?;
        write_segments(w, &self.goto)?;
        write_u32s(w, &self.reduce)?;
        write_u32s(w, &self.productions.lhs)?;
        write_u32s(w, &self.productions.rhs_len)?;
        for word in &self.lookahead.words {
            w.write_u64::<LE>(*word)?;
        }
        Ok(())
    }

    pub fn read_bin<R: Read>(r: &mut R) -> Result<CompactTables, TableIoError> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(TableIoError::BadMagic);
        }

        let n_terminals = r.read_u32::<LE>()?;
        let n_nonterminals = r.read_u32::<LE>()?;
        let start = r.read_u32::<LE>()?;
        let n_states = r.read_u32::<LE>()? as usize;
        let n_productions = r.read_u32::<LE>()? as usize;
        let n_shift = r.read_u32::<LE>()? as usize;
        let n_goto = r.read_u32::<LE>()? as usize;
        let words_per_row = r.read_u32::<LE>()?;
        let shift_reduce_conflicts = r.read_u32::<LE>()?;
        let reduce_reduce_conflicts = r.read_u32::<LE>()?;

        let shift = read_segments(r, n_states, n_shift)?;
        let goto = read_segments(r, n_states, n_goto)?;
        let reduce = read_u32s(r, n_states)?;
        let lhs = read_u32s(r, n_productions)?;
        let rhs_len = read_u32s(r, n_productions)?;

        let n_words = n_productions
            .checked_mul(words_per_row as usize)
            .ok_or_else(|| TableIoError::Inconsistent("lookahead size overflow".to_string()))?;
        let mut words = Vec::with_capacity(n_words.min(MAX_PREALLOC));
        for _ in 0..n_words {
            words.push(r.read_u64::<LE>()?);
        }

        let tables = CompactTables {
            n_terminals,
            n_nonterminals,
            start,
            shift,
            goto,
            reduce,
            productions: ProductionTable { lhs, rhs_len },
            lookahead: LookaheadTable {
                words_per_row,
                words,
            },
            shift_reduce_conflicts,
            reduce_reduce_conflicts,
        };
        tables.validate()?;
        Ok(tables)
    }

    pub fn save_bin(&self, path: &Path) -> Result<(), TableIoError> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_bin(&mut w)?;
        w.flush()?;
        Ok(())
    }

    pub fn load_bin(path: &Path) -> Result<CompactTables, TableIoError> {
        let mut r = BufReader::new(File::open(path)?);
        CompactTables::read_bin(&mut r)
    }

    /// Checks that every index in the tables points inside the tables, so
    /// a loaded table set cannot send the parser out of bounds.
    pub fn validate(&self) -> Result<(), TableIoError> {
        let n_states = self.n_states();
        let n_productions = self.n_productions();
        let n_symbols = self.n_terminals + self.n_nonterminals;

        if n_states == 0 {
            return inconsistent("no states");
        }
        if self.n_terminals == 0 {
            return inconsistent("no terminals");
        }
        if self.start < self.n_terminals || self.start >= n_symbols {
            return inconsistent(format!("start symbol {} is not a nonterminal", self.start));
        }

        for (name, table, terminals) in [("shift", &self.shift, true), ("goto", &self.goto, false)]
        {
            if table.switch().len() != n_states {
                return inconsistent(format!(
                    "{} switch has {} entries for {} states",
                    name,
                    table.switch().len(),
                    n_states
                ));
            }
            for offset in table.switch().iter().copied().filter(|x| *x != NONE) {
                let terminated = table
                    .entries()
                    .get(offset as usize..)
                    .is_some_and(|x| x.iter().any(|(symbol, _)| *symbol == NONE));
                if !terminated {
                    return inconsistent(format!("{} segment at {} is not terminated", name, offset));
                }
            }
            for (symbol, next) in table.entries().iter().copied() {
                if symbol == NONE {
                    continue;
                }
                let in_range = if terminals {
                    symbol < self.n_terminals
                } else {
                    self.n_terminals <= symbol && symbol < n_symbols
                };
                if !in_range || next as usize >= n_states {
                    return inconsistent(format!(
                        "{} entry ({}, {}) is out of range",
                        name, symbol, next
                    ));
                }
            }
        }

        for p in self.reduce.iter().copied() {
            if p != NONE && p as usize >= n_productions {
                return inconsistent(format!("reduce names unknown production {}", p));
            }
        }

        if self.productions.rhs_len.len() != n_productions {
            return inconsistent("production lhs and rhs_len lengths differ");
        }
        for lhs in self.productions.lhs.iter().copied() {
            if lhs < self.n_terminals || lhs >= n_symbols {
                return inconsistent(format!("production lhs {} is not a nonterminal", lhs));
            }
        }

        let words_per_row = (self.n_terminals as usize).div_ceil(64);
        if self.lookahead.words_per_row as usize != words_per_row
            || self.lookahead.words.len() != words_per_row * n_productions
        {
            return inconsistent("lookahead rows do not match the terminal count");
        }

        Ok(())
    }
}
