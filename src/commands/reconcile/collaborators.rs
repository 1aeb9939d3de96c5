use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, info, warn};

pub(crate) trait PageTextSource {
    fn page_text(&self, page: u32) -> Option<String>;
}

/// `Ok(None)` means the page carries no reference.
pub(crate) trait SolutionPageReader {
    fn read_solution_page(&mut self, page: u32) -> Result<Option<u32>>;
}

#[derive(Debug, Default)]
pub(crate) struct NoPageText;

impl PageTextSource for NoPageText {
    fn page_text(&self, _page: u32) -> Option<String> {
        None
    }
}

#[derive(Debug, Default)]
pub(crate) struct NoSolutionPageReader;

impl SolutionPageReader for NoSolutionPageReader {
    fn read_solution_page(&mut self, _page: u32) -> Result<Option<u32>> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FormFeedPageText {
    pages: Vec<String>,
}

impl FormFeedPageText {
    pub fn from_text(raw: &str) -> Self {
        let mut pages: Vec<String> = raw
            .split('\u{000C}')
            .map(|chunk| chunk.replace('\u{0000}', ""))
            .collect();

        while let Some(last_page) = pages.last() {
            if last_page.trim().is_empty() {
                pages.pop();
                continue;
            }
            break;
        }

        Self { pages }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let text = Self::from_text(&String::from_utf8_lossy(&raw));
        info!(path = %path.display(), pages = text.pages.len(), "loaded page text");
        Ok(text)
    }
}

impl PageTextSource for FormFeedPageText {
    fn page_text(&self, page: u32) -> Option<String> {
        let index = page.checked_sub(1)? as usize;
        self.pages
            .get(index)
            .filter(|text| !text.trim().is_empty())
            .cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RateLimited {
    pub page: u32,
    pub detail: String,
}

impl fmt::Display for RateLimited {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "solution-page reader rate limited on page {}: {}", self.page, self.detail)
    }
}

impl std::error::Error for RateLimited {}

const EX_TEMPFAIL: i32 = 75;

#[derive(Debug, Deserialize)]
struct SolutionPageResponse {
    #[serde(rename = "solutionPage", default)]
    solution_page: Option<i64>,
}

#[derive(Debug, Clone)]
pub(crate) struct CommandSolutionPageReader {
    program: String,
    args: Vec<String>,
    image_dir: PathBuf,
}

impl CommandSolutionPageReader {
    pub fn new(program: impl Into<String>, args: Vec<String>, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            image_dir: image_dir.into(),
        }
    }

    pub fn image_path(&self, page: u32) -> PathBuf {
        self.image_dir.join(format!("page-{page:03}.png"))
    }
}

impl SolutionPageReader for CommandSolutionPageReader {
    fn read_solution_page(&mut self, page: u32) -> Result<Option<u32>> {
        let image_path = self.image_path(page);
        if !image_path.exists() {
            bail!("page image missing: {}", image_path.display());
        }

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&image_path)
            .output()
            .with_context(|| format!("failed to execute {} for {}", self.program, image_path.display()))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_rate_limit_signal(output.status.code(), &stderr) {
            return Err(RateLimited {
                page,
                detail: stderr.trim().to_string(),
            }
            .into());
        }

        if !output.status.success() {
            bail!(
                "{} returned non-zero exit status for {}: {}",
                self.program,
                image_path.display(),
                stderr.trim()
            );
        }

        parse_reader_response(&String::from_utf8_lossy(&output.stdout))
            .with_context(|| format!("failed to parse {} output for page {page}", self.program))
    }
}

fn is_rate_limit_signal(code: Option<i32>, stderr: &str) -> bool {
    if code == Some(EX_TEMPFAIL) {
        return true;
    }
    let lowered = stderr.to_ascii_lowercase();
    lowered.contains("rate limit") || lowered.contains("ratelimit") || lowered.contains("429")
}

pub(crate) fn parse_reader_response(stdout: &str) -> Result<Option<u32>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let response: SolutionPageResponse =
        serde_json::from_str(trimmed).context("reader output is not a solutionPage JSON object")?;
    Ok(response
        .solution_page
        .filter(|page| *page > 0)
        .and_then(|page| u32::try_from(page).ok()))
}

pub(crate) struct PacedSolutionPageReader<R> {
    inner: R,
    min_interval: Duration,
    max_retries: u32,
    backoff_base: Duration,
    last_call: Option<Instant>,
}

impl<R: SolutionPageReader> PacedSolutionPageReader<R> {
    pub fn new(inner: R, min_interval: Duration, max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            inner,
            min_interval,
            max_retries,
            backoff_base,
            last_call: None,
        }
    }

    fn wait_for_slot(&self) {
        let Some(last_call) = self.last_call else {
            return;
        };
        let elapsed = last_call.elapsed();
        if elapsed < self.min_interval {
            thread::sleep(self.min_interval - elapsed);
        }
    }
}

impl<R: SolutionPageReader> SolutionPageReader for PacedSolutionPageReader<R> {
    fn read_solution_page(&mut self, page: u32) -> Result<Option<u32>> {
        let mut attempt = 0u32;
        loop {
            self.wait_for_slot();
            self.last_call = Some(Instant::now());

            match self.inner.read_solution_page(page) {
                Err(error) if error.downcast_ref::<RateLimited>().is_some() => {
                    if attempt >= self.max_retries {
                        return Err(error).with_context(|| {
                            format!("gave up on page {page} after {} rate-limited attempts", attempt + 1)
                        });
                    }
                    let backoff = self.backoff_base.saturating_mul(2u32.saturating_pow(attempt));
                    warn!(page, attempt = attempt + 1, backoff_ms = backoff.as_millis() as u64, "reader rate limited; backing off");
                    thread::sleep(backoff);
                    attempt += 1;
                }
                result => {
                    debug!(page, attempt = attempt + 1, "solution-page reader call finished");
                    return result;
                }
            }
        }
    }
}
