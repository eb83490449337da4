//! Interactive numbered-menu classification prompt.

use std::cell::RefCell;
use std::io::{self, BufRead, Write};

use crate::domain::asset_class::AssetClass;
use crate::domain::error::ModelfolioError;
use crate::ports::prompt_port::ClassificationPrompt;

/// Class used when input ends before a valid choice is made.
pub const EOF_DEFAULT: AssetClass = AssetClass::Alternatives;

pub struct ConsolePrompt<R, W> {
    input: RefCell<R>,
    output: RefCell<W>,
}

impl ConsolePrompt<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }

    pub fn into_output(self) -> W {
        self.output.into_inner()
    }
}

impl<R: BufRead, W: Write> ClassificationPrompt for ConsolePrompt<R, W> {
    fn choose(&self, ticker: &str, options: &[AssetClass]) -> Result<AssetClass, ModelfolioError> {
        let mut out = self.output.borrow_mut();
        let mut input = self.input.borrow_mut();

        writeln!(out, "\nCould not classify {ticker}. Choose an asset class:")?;
        for (i, class) in options.iter().enumerate() {
            writeln!(out, "  {}. {}", i + 1, class)?;
        }

        loop {
            write!(out, "Enter choice (1-{}): ", options.len())?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                tracing::warn!(ticker, class = %EOF_DEFAULT, "no input, using default class");
                writeln!(out)?;
                return Ok(EOF_DEFAULT);
            }

            let choice = line.trim();
            let picked = choice
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| options.get(i).copied())
                .or_else(|| {
                    options
                        .iter()
                        .copied()
                        .find(|c| c.label().eq_ignore_ascii_case(choice))
                });

            match picked {
                Some(class) => return Ok(class),
                None => writeln!(out, "Invalid choice '{choice}'.")?,
            }
        }
    }
}
