// Primitives for reading and writing CSV files.

use std::io::Write;
use std::path::{Path, PathBuf};

use survey_cleaning::builder::Builder;

use crate::prep::{
    io_common::{simplify_file_name, staging_path},
    *,
};

/// Reads a survey export. The first record is the header.
pub fn read_csv_export(path: &str) -> BPrepResult<Dataset> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();

    let header = records
        .next()
        .context(EmptyInputSnafu { path })?
        .context(CsvLineParseSnafu { path, lineno: 1usize })?;
    let columns: Vec<String> = header.iter().map(|s| s.to_string()).collect();
    debug!("read_csv_export: header: {:?}", columns);

    let mut builder = Builder::new(&columns);
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let fields: Vec<&str> = line.iter().collect();
        builder
            .add_record(&fields)
            .context(RowShapeSnafu { path, lineno })?;
    }
    let ds = builder.build();
    info!(
        "read_csv_export: {} rows, {} columns from {}",
        ds.len(),
        ds.width(),
        simplify_file_name(Path::new(path))
    );
    Ok(ds)
}

/// Reads the reference column order: every non-empty field, row after row.
/// The file may hold the names on a single row or in a single column.
pub fn read_column_order(path: &str) -> BPrepResult<Vec<String>> {
    let bytes = fs::read(path).context(ColumnOrderOpenSnafu { path })?;
    let content = String::from_utf8(bytes).context(ColumnOrderEncodingSnafu { path })?;
    let content = content.trim_start_matches('\u{feff}');

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut names: Vec<String> = Vec::new();
    for record in rdr.records() {
        let record = record.context(ColumnOrderParseSnafu { path })?;
        for field in record.iter() {
            let name = field.trim();
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
    }
    debug!("read_column_order: {:?}", names);
    Ok(names)
}

fn write_dataset<W: Write>(ds: &Dataset, wtr: &mut csv::Writer<W>) -> Result<(), csv::Error> {
    wtr.write_record(ds.columns())?;
    for row in ds.rows() {
        wtr.write_record(row.iter().map(|c| c.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// The CSV text of a dataset, as it would be written to a file.
pub fn render_csv(ds: &Dataset) -> PrepResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    write_dataset(ds, &mut wtr).context(WritingCsvSnafu { path: "<memory>" })?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| e.into_error())
        .context(WritingFileSnafu { path: "<memory>" })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_file(ds: &Dataset, path: &Path) -> PrepResult<()> {
    let path_s = path.display().to_string();
    let mut wtr = csv::Writer::from_path(path).context(WritingCsvSnafu { path: &path_s })?;
    write_dataset(ds, &mut wtr).context(WritingCsvSnafu { path: &path_s })?;
    Ok(())
}

/// A set of output files that appear together or not at all.
///
/// Each file is first written next to its target under a temporary name.
/// `commit` moves them in place; if one of the moves fails, the files
/// already moved by this commit are removed again. Dropping the batch
/// without committing removes the temporary files.
pub struct OutputBatch {
    dir: PathBuf,
    staged: Vec<(PathBuf, PathBuf)>,
    stale: Vec<PathBuf>,
}

impl OutputBatch {
    pub fn new(dir: &Path) -> BPrepResult<OutputBatch> {
        fs::create_dir_all(dir).context(WritingFileSnafu {
            path: dir.display().to_string(),
        })?;
        Ok(OutputBatch {
            dir: dir.to_path_buf(),
            staged: Vec::new(),
            stale: Vec::new(),
        })
    }

    pub fn stage(&mut self, ds: &Dataset, file_name: &str) -> BPrepResult<()> {
        let target = self.dir.join(file_name);
        let tmp = staging_path(&target);
        debug!("OutputBatch::stage: {:?}", tmp);
        if let Err(e) = write_file(ds, &tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(Box::new(e));
        }
        self.staged.push((tmp, target));
        Ok(())
    }

    /// Marks a file left over by a previous run, removed on commit.
    pub fn remove_stale(&mut self, file_name: &str) {
        self.stale.push(self.dir.join(file_name));
    }

    pub fn commit(mut self) -> BPrepResult<Vec<PathBuf>> {
        let staged = std::mem::take(&mut self.staged);
        let mut written: Vec<PathBuf> = Vec::new();
        for (idx, (tmp, target)) in staged.iter().enumerate() {
            if let Err(source) = fs::rename(tmp, target) {
                for p in written.iter() {
                    warn!("Rolling back {}", p.display());
                    let _ = fs::remove_file(p);
                }
                // The remaining temporary files get cleaned up on drop.
                self.staged = staged[idx..].to_vec();
                return Err(Box::new(PrepError::WritingFile {
                    source,
                    path: target.display().to_string(),
                }));
            }
            written.push(target.clone());
        }
        for p in std::mem::take(&mut self.stale) {
            match fs::remove_file(&p) {
                Ok(()) => info!("Removed stale output {}", p.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(Box::new(PrepError::WritingFile {
                        source,
                        path: p.display().to_string(),
                    }))
                }
            }
        }
        for p in written.iter() {
            info!("Wrote {}", p.display());
        }
        Ok(written)
    }
}

impl Drop for OutputBatch {
    fn drop(&mut self) {
        for (tmp, _) in self.staged.drain(..) {
            warn!("Removing unfinished output {}", tmp.display());
            let _ = fs::remove_file(tmp);
        }
    }
}
