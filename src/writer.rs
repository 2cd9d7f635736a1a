use std::{fs::File, io::BufWriter, path::PathBuf, sync::mpsc::Receiver};

use log::error;
use serde_jsonlines::JsonLinesWriter;

use crate::{LmuWeatherError, properties::PropertyDump};

/// Writes every received property table to `file` as JSON Lines until the sender side
/// hangs up.
pub fn write_properties(
    file: &PathBuf,
    dump_receiver: Receiver<PropertyDump>,
) -> Result<(), LmuWeatherError> {
    let output_file = File::create(file).map_err(|e| LmuWeatherError::WriterError { source: e })?;
    let mut writer = JsonLinesWriter::new(BufWriter::new(output_file));
    for dump in &dump_receiver {
        if let Err(e) = writer.write(&dump) {
            error!("Error while writing property table to output file: {}", e);
        }
    }
    writer
        .flush()
        .map_err(|e| LmuWeatherError::WriterError { source: e })?;
    Ok(())
}
