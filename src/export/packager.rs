use std::io::{Cursor, Seek, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::engine::combine::{Combinations, Selection};
use crate::export::filename::FilenameAllocator;
use crate::foundation::core::Canvas;
use crate::foundation::error::{StrataError, StrataResult};
use crate::registry::model::LayerRegistry;
use crate::render::compositor::Compositor;

/// One finished batch output: PNG bytes plus the selection and filename that produced them.
#[derive(Clone, Debug)]
pub struct GeneratedOutput {
    /// 1-based position in combination-set enumeration order.
    pub sequential_id: u64,
    pub selection: Selection,
    pub filename: String,
    pub png: Vec<u8>,
}

/// Which stage of a batch run a progress event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Render,
    Package,
}

/// Incremental progress event, fired in enumeration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
    pub phase: Phase,
}

/// Configuration provided to an [`OutputSink`] at the start of a batch run.
#[derive(Clone, Copy, Debug)]
pub struct SinkConfig {
    pub canvas: Canvas,
    /// Combination-set size; the number of pushes may be lower when renders are skipped.
    pub expected_total: u64,
}

/// Sink contract for consuming batch outputs.
///
/// Ordering contract: `push_output` is called in strictly increasing `sequential_id` order, and
/// only from the batch loop, never concurrently.
pub trait OutputSink {
    /// Called once before any outputs are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> StrataResult<()>;
    /// Push one output in enumeration order.
    fn push_output(&mut self, output: &GeneratedOutput) -> StrataResult<()>;
    /// Called once after the last output, even when the run was cancelled.
    fn end(&mut self) -> StrataResult<()>;
}

/// In-memory sink for tests and for callers that want the full output collection.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    outputs: Vec<GeneratedOutput>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn outputs(&self) -> &[GeneratedOutput] {
        &self.outputs
    }

    pub fn into_outputs(self) -> Vec<GeneratedOutput> {
        self.outputs
    }
}

impl OutputSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> StrataResult<()> {
        self.cfg = Some(cfg);
        self.outputs.clear();
        Ok(())
    }

    fn push_output(&mut self, output: &GeneratedOutput) -> StrataResult<()> {
        self.outputs.push(output.clone());
        Ok(())
    }

    fn end(&mut self) -> StrataResult<()> {
        Ok(())
    }
}

/// Streams outputs into a zip archive as they are produced, so large batches never hold every
/// raster in memory at once.
#[derive(Debug)]
pub struct ZipSink<W: Write + Seek> {
    writer: Option<ZipWriter<W>>,
    finished: Option<W>,
    entries: u64,
}

impl<W: Write + Seek> ZipSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Some(ZipWriter::new(inner)),
            finished: None,
            entries: 0,
        }
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    fn write_entry(&mut self, filename: &str, bytes: &[u8]) -> StrataResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| StrataError::packaging("zip sink already finalized"))?;
        writer
            .start_file(filename, zip_entry_options())
            .map_err(|e| StrataError::packaging(format!("start zip entry '{filename}': {e}")))?;
        writer
            .write_all(bytes)
            .map_err(|e| StrataError::packaging(format!("write zip entry '{filename}': {e}")))?;
        self.entries += 1;
        Ok(())
    }

    /// Recover the underlying writer after [`OutputSink::end`] has finalized the archive.
    pub fn into_inner(self) -> StrataResult<W> {
        self.finished
            .ok_or_else(|| StrataError::packaging("zip archive was not finalized"))
    }
}

impl<W: Write + Seek> OutputSink for ZipSink<W> {
    fn begin(&mut self, _cfg: SinkConfig) -> StrataResult<()> {
        Ok(())
    }

    fn push_output(&mut self, output: &GeneratedOutput) -> StrataResult<()> {
        self.write_entry(&output.filename, &output.png)
    }

    fn end(&mut self) -> StrataResult<()> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| StrataError::packaging("zip sink already finalized"))?;
        let inner = writer
            .finish()
            .map_err(|e| StrataError::packaging(format!("finalize zip archive: {e}")))?;
        self.finished = Some(inner);
        Ok(())
    }
}

fn zip_entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated)
}

/// Package an already-generated output collection into zip archive bytes.
///
/// Entries are written in slice order under each output's filename. Finalization failures
/// surface as `Packaging`; the caller's outputs remain available for retry.
pub fn package(outputs: &[GeneratedOutput]) -> StrataResult<Vec<u8>> {
    let mut sink = ZipSink::new(Cursor::new(Vec::new()));
    for output in outputs {
        sink.write_entry(&output.filename, &output.png)?;
    }
    sink.end()?;
    Ok(sink.into_inner()?.into_inner())
}

/// Client-requested abort signal, observed at combination boundaries (never mid-render).
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A combination whose render failed and was skipped.
#[derive(Clone, Debug)]
pub struct SkippedCombination {
    /// 1-based enumeration index of the failed combination.
    pub sequential_id: u64,
    /// Failure detail, including the offending trait's source reference.
    pub reason: String,
}

/// Final accounting of a batch run.
#[derive(Clone, Debug, Default)]
pub struct BatchSummary {
    pub total: u64,
    pub produced: u64,
    pub skipped: Vec<SkippedCombination>,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn skipped_count(&self) -> u64 {
        self.skipped.len() as u64
    }
}

/// Drives the combination engine and compositor over the full combination set, streaming each
/// output into a sink.
#[derive(Clone, Debug)]
pub struct BatchExporter {
    canvas: Canvas,
    cancel: Option<CancelToken>,
}

impl BatchExporter {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            cancel: None,
        }
    }

    /// Attach an abort signal checked at every combination boundary.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Render and stream every combination, in enumeration order.
    ///
    /// Per-combination `AssetLoad` failures are skipped, recorded, and counted in the returned
    /// summary; the batch continues. Sink failures (`Packaging`) abort the run. Progress fires
    /// after every combination, produced or skipped, in the same order as the outputs.
    pub fn generate_all(
        &self,
        registry: &LayerRegistry,
        compositor: &mut Compositor,
        sink: &mut dyn OutputSink,
        on_progress: &mut dyn FnMut(Progress),
    ) -> StrataResult<BatchSummary> {
        let total = registry.total_combinations();
        sink.begin(SinkConfig {
            canvas: self.canvas,
            expected_total: total,
        })?;

        let mut allocator = FilenameAllocator::new(total);
        let mut summary = BatchSummary {
            total,
            ..Default::default()
        };

        for (i, selection) in Combinations::new(registry).enumerate() {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                summary.cancelled = true;
                break;
            }
            let sequential_id = i as u64 + 1;

            match self.render_one(compositor, &selection) {
                Ok(png) => {
                    let filename = allocator.allocate(&selection, sequential_id);
                    debug!(sequential_id, %filename, "produced combination");
                    sink.push_output(&GeneratedOutput {
                        sequential_id,
                        selection,
                        filename,
                        png,
                    })?;
                    summary.produced += 1;
                }
                Err(err @ StrataError::AssetLoad { .. }) => {
                    warn!(sequential_id, error = %err, "skipping combination");
                    summary.skipped.push(SkippedCombination {
                        sequential_id,
                        reason: err.to_string(),
                    });
                }
                Err(other) => return Err(other),
            }

            on_progress(Progress {
                current: sequential_id,
                total,
                phase: Phase::Render,
            });
        }

        sink.end()?;
        on_progress(Progress {
            current: summary.produced,
            total,
            phase: Phase::Package,
        });
        Ok(summary)
    }

    fn render_one(
        &self,
        compositor: &mut Compositor,
        selection: &Selection,
    ) -> StrataResult<Vec<u8>> {
        let raster = compositor.render(selection, self.canvas)?;
        raster.encode_png()
    }
}
