use std::fs::File;
use std::path::Path;
use std::time::Instant;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info, warn};

use super::{
    BookCatalog, BookRecord, ColumnNames, PopularBook, PopularityTable, SimilarityMatrix,
    TitleIndex, POPULAR_SIZE,
};
use crate::error::{LoadError, Result};

/// Loads the paired title index and similarity matrix.
///
/// The header row carries the column titles after one leading label cell.
/// Every following row starts with its own title, which must equal the header
/// title at the same position, followed by one score per column.
pub fn load_similarity(path: &Path) -> Result<(TitleIndex, SimilarityMatrix)> {
    let started = Instant::now();
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|err| LoadError::csv(path, err))?
        .clone();
    let titles: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    let dimension = titles.len();

    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(dimension);
    for result in reader.records() {
        let record = result.map_err(|err| LoadError::csv(path, err))?;
        let line = line_of(&record);
        let row = rows.len();
        let Some(expected) = titles.get(row) else {
            return Err(LoadError::invalid(
                path,
                format!("line {line}: more rows than the {dimension} header titles"),
            ));
        };
        let row_title = record.get(0).unwrap_or_default();
        if row_title != expected {
            return Err(LoadError::invalid(
                path,
                format!("line {line}: row title '{row_title}' does not match column title '{expected}'"),
            ));
        }
        let found = record.len().saturating_sub(1);
        if found != dimension {
            return Err(LoadError::invalid(
                path,
                format!("line {line}: expected {dimension} scores, found {found}"),
            ));
        }
        let mut scores = Vec::with_capacity(dimension);
        for (column, raw) in record.iter().skip(1).enumerate() {
            let score = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| LoadError::InvalidValue {
                    path: path.to_path_buf(),
                    line,
                    column: titles[column].clone(),
                    value: raw.to_string(),
                })?;
            scores.push(score);
        }
        rows.push(scores);
    }
    if rows.len() != dimension {
        return Err(LoadError::invalid(
            path,
            format!("found {} rows for {dimension} header titles", rows.len()),
        ));
    }

    let index = TitleIndex::new(titles).map_err(|err| LoadError::table(path, err))?;
    let matrix = SimilarityMatrix::from_rows(rows).map_err(|err| LoadError::table(path, err))?;
    info!(
        path = %path.display(),
        titles = index.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "loaded similarity matrix"
    );
    Ok((index, matrix))
}

/// Loads the book catalog.
///
/// Only the title column is required. Rows with a blank title are skipped.
pub fn load_books(path: &Path, columns: &ColumnNames) -> Result<BookCatalog> {
    let started = Instant::now();
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|err| LoadError::csv(path, err))?
        .clone();
    let title_idx = find_column(path, &headers, &columns.title)?;
    let author_idx = position_of(&headers, &columns.author);
    let image_idx = position_of(&headers, &columns.image);
    if author_idx.is_none() {
        warn!(path = %path.display(), column = %columns.author, "author column missing");
    }

    let mut records = Vec::new();
    let mut skipped = 0u64;
    for result in reader.records() {
        let record = result.map_err(|err| LoadError::csv(path, err))?;
        let title = record.get(title_idx).unwrap_or_default();
        if title.trim().is_empty() {
            skipped += 1;
            continue;
        }
        records.push(BookRecord {
            title: title.to_string(),
            author: optional_cell(&record, author_idx),
            image: optional_cell(&record, image_idx),
        });
    }
    if skipped > 0 {
        debug!(path = %path.display(), skipped, "skipped catalog rows without a title");
    }

    let catalog = BookCatalog::from_records(records);
    info!(
        path = %path.display(),
        records = catalog.len(),
        titles = catalog.distinct_titles(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "loaded book catalog"
    );
    Ok(catalog)
}

/// Loads the popularity table, keeping the first [`POPULAR_SIZE`] rows.
pub fn load_popular(path: &Path, columns: &ColumnNames) -> Result<PopularityTable> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|err| LoadError::csv(path, err))?
        .clone();
    let title_idx = find_column(path, &headers, &columns.title)?;
    let author_idx = find_column(path, &headers, &columns.author)?;
    let image_idx = find_column(path, &headers, &columns.image)?;
    let count_idx = find_column(path, &headers, &columns.rating_count)?;
    let rating_idx = find_column(path, &headers, &columns.average_rating)?;

    let mut books = Vec::with_capacity(POPULAR_SIZE);
    for result in reader.records() {
        let record = result.map_err(|err| LoadError::csv(path, err))?;
        let line = line_of(&record);
        let rating_count = parse_cell::<u64>(path, &record, count_idx, &columns.rating_count)?;
        let average_rating = parse_cell::<f64>(path, &record, rating_idx, &columns.average_rating)
            .and_then(|value| {
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(LoadError::InvalidValue {
                        path: path.to_path_buf(),
                        line,
                        column: columns.average_rating.clone(),
                        value: value.to_string(),
                    })
                }
            })?;
        books.push(PopularBook {
            title: record.get(title_idx).unwrap_or_default().to_string(),
            author: record.get(author_idx).unwrap_or_default().trim().to_string(),
            image: optional_cell(&record, Some(image_idx)),
            rating_count,
            average_rating,
        });
    }

    match books.len() {
        n if n > POPULAR_SIZE => {
            warn!(path = %path.display(), rows = n, kept = POPULAR_SIZE, "truncating popularity table")
        }
        n if n < POPULAR_SIZE => {
            warn!(path = %path.display(), rows = n, "popularity table is short")
        }
        _ => {}
    }
    let table = PopularityTable::new(books);
    info!(path = %path.display(), books = table.len(), "loaded popularity table");
    Ok(table)
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|err| LoadError::io(path, err))?;
    Ok(ReaderBuilder::new().flexible(true).from_reader(file))
}

fn position_of(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn find_column(path: &Path, headers: &StringRecord, name: &str) -> Result<usize> {
    position_of(headers, name).ok_or_else(|| LoadError::MissingColumn {
        path: path.to_path_buf(),
        column: name.to_string(),
    })
}

fn optional_cell(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|idx| record.get(idx))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_cell<T: std::str::FromStr>(
    path: &Path,
    record: &StringRecord,
    idx: usize,
    column: &str,
) -> Result<T> {
    let raw = record.get(idx).unwrap_or_default();
    raw.trim().parse::<T>().map_err(|_| LoadError::InvalidValue {
        path: path.to_path_buf(),
        line: line_of(record),
        column: column.to_string(),
        value: raw.to_string(),
    })
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|pos| pos.line()).unwrap_or(0)
}
