use std::{
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;

#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn stdout() -> Self {
        Output::Stdout {
            writer: io::stdout().lock(),
        }
    }

    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_string(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, &value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(&mut *self).with_context(|| {
            format!(
                "Failed to write newline after JSON to {}",
                self.display_path()
            )
        })?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path()))?;
        Ok(())
    }

    /// Writes a CSV table: a header row, then one row per record.
    pub fn write_csv<I>(self, header: &[String], records: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let path = self.display_path();
        let mut writer = csv::Writer::from_writer(self);
        writer
            .write_record(header)
            .with_context(|| format!("Failed to write CSV header to {path}"))?;
        for record in records {
            writer
                .write_record(&record)
                .with_context(|| format!("Failed to write CSV row to {path}"))?;
        }
        finish_csv(writer, &path)
    }

    /// Writes serializable records as a CSV table with a derived header.
    pub fn write_csv_records<T>(self, records: &[T]) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let path = self.display_path();
        let mut writer = csv::Writer::from_writer(self);
        for record in records {
            writer
                .serialize(record)
                .with_context(|| format!("Failed to write CSV row to {path}"))?;
        }
        finish_csv(writer, &path)
    }
}

fn finish_csv(mut writer: csv::Writer<Output>, path: &str) -> anyhow::Result<()> {
    writer
        .flush()
        .with_context(|| format!("Failed to flush output to {path}"))
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

/// Opens `path` for buffered reading, naming `file_kind` in the error.
pub fn open_file<P>(file_kind: &str, path: P) -> anyhow::Result<io::BufReader<File>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;
    Ok(io::BufReader::new(file))
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let reader = open_file(file_kind, path)?;
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse {file_kind} JSON file: {}", path.display()))
}

/// Formats an optional float for a CSV cell; absent values are empty.
pub fn float_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
