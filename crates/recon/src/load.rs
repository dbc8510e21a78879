//! CSV loading. Raw spreadsheet headers are mapped onto [`Field`]s and cells
//! are coerced to typed values here, so nothing downstream sees strings it
//! has to guess about.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::error::ReconError;
use crate::kind::EntityKind;
use crate::model::{
    BankDeposit, ExistingEntity, Field, FieldValue, ParsedRow, RowSet, StripeChargeRow, ValueType,
};
use crate::money::parse_cents;

// ---------------------------------------------------------------------------
// Header aliases
// ---------------------------------------------------------------------------

/// Header names accepted for each field, on top of the field's own name.
#[derive(Debug, Clone, Default)]
pub struct ColumnAliases {
    extra: BTreeMap<Field, Vec<String>>,
}

fn builtin_aliases(field: Field) -> &'static [&'static str] {
    match field {
        Field::Name => &["name", "bezeichnung", "display name"],
        Field::Iban => &["iban", "account number", "kontonummer"],
        Field::Bic => &["bic", "swift", "swift code"],
        Field::BankName => &["bank", "bank name", "bankname", "kreditinstitut"],
        Field::Holder => &["holder", "account holder", "kontoinhaber"],
        Field::TaxId => &["tax id", "tax number", "vat id", "steuernummer", "ust-idnr", "nif"],
        Field::Email => &["email", "e-mail", "mail"],
        Field::Phone => &["phone", "telephone", "telefon", "mobile"],
        Field::Street => &["street", "address", "strasse", "straße"],
        Field::Zip => &["zip", "postal code", "postcode", "plz"],
        Field::City => &["city", "town", "ort", "stadt"],
        Field::Country => &["country", "land"],
        Field::ContactType => &["contact type", "type"],
        Field::CategoryType => &["category type", "type", "typ"],
        Field::Description => &["description", "beschreibung"],
        Field::Order => &["order", "sort", "position"],
        Field::Salary => &["salary", "gehalt"],
        Field::IsDefault => &["default", "is default", "standard"],
        Field::IsActive => &["active", "is active", "aktiv"],
        Field::Note => &["note", "notes", "notiz"],
    }
}

fn header_key(header: &str) -> String {
    header.trim().to_lowercase().replace('_', " ")
}

impl ColumnAliases {
    pub fn new(extra: BTreeMap<Field, Vec<String>>) -> Self {
        Self { extra }
    }

    /// Resolve a header to one of `candidates`. Configured aliases win over
    /// built-in ones, so a mapping can redirect an ambiguous header like "Type".
    pub fn resolve(&self, header: &str, candidates: &[Field]) -> Option<Field> {
        let key = header_key(header);
        if key.is_empty() {
            return None;
        }
        let configured = candidates.iter().find(|f| {
            self.extra
                .get(f)
                .is_some_and(|names| names.iter().any(|n| header_key(n) == key))
        });
        if let Some(f) = configured {
            return Some(*f);
        }
        candidates.iter().copied().find(|f| {
            header_key(f.as_str()) == key || builtin_aliases(*f).iter().any(|a| *a == key)
        })
    }
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "x" | "ja" | "si" | "sí" => Some(true),
        "0" | "false" | "no" | "n" | "nein" => Some(false),
        _ => None,
    }
}

fn coerce(
    source: &str,
    row_index: usize,
    field: Field,
    cell: &str,
) -> Result<Option<FieldValue>, ReconError> {
    let cell = cell.trim();
    // Blank means "not provided", never "clear the stored value".
    if cell.is_empty() {
        return Ok(None);
    }
    let bad = || ReconError::FieldParse {
        source: source.into(),
        record: format!("row {row_index}"),
        column: field.as_str().into(),
        value: cell.into(),
    };
    let value = match field.value_type() {
        ValueType::Text => FieldValue::Text(cell.to_string()),
        ValueType::Flag => FieldValue::Flag(parse_flag(cell).ok_or_else(bad)?),
        ValueType::Int => FieldValue::Int(cell.parse().map_err(|_| bad())?),
        ValueType::Cents => FieldValue::Cents(parse_cents(cell).ok_or_else(|| {
            ReconError::AmountParse {
                source: source.into(),
                record: format!("row {row_index}"),
                value: cell.into(),
            }
        })?),
    };
    Ok(Some(value))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // Processor exports carry a time part; only the day matters.
    let day = s.split([' ', 'T']).next().unwrap_or(s);
    ["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

struct Sheet {
    headers: Vec<String>,
    records: Vec<csv::StringRecord>,
}

fn read_sheet(csv_data: &str) -> Result<Sheet, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ReconError::Io(e.to_string()))?;

    Ok(Sheet { headers, records })
}

impl Sheet {
    fn position(&self, name: &str) -> Option<usize> {
        let key = header_key(name);
        self.headers.iter().position(|h| header_key(h) == key)
    }

    /// Non-blank records with their spreadsheet row number. Taken from the
    /// reader's line count, since the reader drops empty lines silently.
    fn rows(&self) -> impl Iterator<Item = (usize, &csv::StringRecord)> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.iter().all(|c| c.trim().is_empty()))
            .map(|(i, r)| (r.position().map_or(i + 2, |p| p.line() as usize), r))
    }

    fn require(&self, source: &str, name: &str) -> Result<usize, ReconError> {
        self.position(name).ok_or_else(|| ReconError::MissingColumn {
            source: source.into(),
            column: name.into(),
        })
    }

    /// Column index per field for every header the kind understands.
    /// The first header mapping to a field wins.
    fn field_columns(&self, kind: EntityKind, aliases: &ColumnAliases) -> Vec<(usize, Field)> {
        let known = kind.config().known_fields();
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for (i, header) in self.headers.iter().enumerate() {
            match aliases.resolve(header, &known) {
                Some(field) if seen.insert(field) => out.push((i, field)),
                Some(field) => log::debug!("{kind}: header '{header}' repeats {field}, ignored"),
                None => log::debug!("{kind}: header '{header}' not mapped"),
            }
        }
        out
    }
}

fn cell(record: &csv::StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("").trim()
}

fn typed_fields(
    source: &str,
    row_index: usize,
    record: &csv::StringRecord,
    columns: &[(usize, Field)],
) -> Result<BTreeMap<Field, FieldValue>, ReconError> {
    let mut fields = BTreeMap::new();
    for &(idx, field) in columns {
        if let Some(value) = coerce(source, row_index, field, cell(record, idx))? {
            fields.insert(field, value);
        }
    }
    Ok(fields)
}

/// Load an import sheet for one entity kind.
///
/// Row indexes are spreadsheet row numbers: the first data row is row 2.
pub fn load_rows(
    kind: EntityKind,
    csv_data: &str,
    aliases: &ColumnAliases,
) -> Result<RowSet, ReconError> {
    let sheet = read_sheet(csv_data)?;
    let columns = sheet.field_columns(kind, aliases);

    let mut rows = Vec::with_capacity(sheet.records.len());
    for (row_index, record) in sheet.rows() {
        let fields = typed_fields(kind.as_str(), row_index, record, &columns)?;
        rows.push(ParsedRow { row_index, fields });
    }

    log::debug!("{kind}: loaded {} row(s), {} mapped column(s)", rows.len(), columns.len());
    Ok(RowSet::with_columns(
        kind,
        columns.iter().map(|(_, f)| *f).collect(),
        rows,
    ))
}

/// Load stored records of one kind. The sheet needs an `id` column.
pub fn load_existing(
    kind: EntityKind,
    csv_data: &str,
    aliases: &ColumnAliases,
) -> Result<Vec<ExistingEntity>, ReconError> {
    let source = format!("existing {kind}");
    let sheet = read_sheet(csv_data)?;
    let id_idx = sheet.require(&source, "id")?;
    let columns: Vec<(usize, Field)> = sheet
        .field_columns(kind, aliases)
        .into_iter()
        .filter(|(i, _)| *i != id_idx)
        .collect();

    let mut out = Vec::with_capacity(sheet.records.len());
    for (row_index, record) in sheet.rows() {
        let id = cell(record, id_idx);
        if id.is_empty() {
            return Err(ReconError::FieldParse {
                source,
                record: format!("row {row_index}"),
                column: "id".into(),
                value: String::new(),
            });
        }
        out.push(ExistingEntity {
            id: id.to_string(),
            fields: typed_fields(&source, row_index, record, &columns)?,
        });
    }
    Ok(out)
}

/// Load a payment-processor charge export.
pub fn load_charges(csv_data: &str) -> Result<Vec<StripeChargeRow>, ReconError> {
    const SOURCE: &str = "charges";
    let sheet = read_sheet(csv_data)?;

    let id_idx = sheet.require(SOURCE, "id")?;
    let date_idx = sheet.require(SOURCE, "Created date (UTC)")?;
    let amount_idx = sheet.require(SOURCE, "Amount")?;
    let fee_idx = sheet.require(SOURCE, "Fee")?;
    let status_idx = sheet.require(SOURCE, "Status")?;
    let transfer_idx = sheet.require(SOURCE, "Transfer")?;
    let email_idx = sheet.position("Customer Email");
    let refunded_idx = sheet.position("Amount Refunded");

    let amount = |record: &csv::StringRecord, idx: usize, id: &str| {
        let raw = cell(record, idx);
        parse_cents(raw).ok_or_else(|| ReconError::AmountParse {
            source: SOURCE.into(),
            record: id.into(),
            value: raw.into(),
        })
    };

    let mut rows = Vec::with_capacity(sheet.records.len());
    for (_, record) in sheet.rows() {
        let id = cell(record, id_idx).to_string();

        let date_str = cell(record, date_idx);
        let created_date = parse_date(date_str).ok_or_else(|| ReconError::DateParse {
            source: SOURCE.into(),
            record: id.clone(),
            value: date_str.into(),
        })?;

        let amount_refunded_cents = match refunded_idx {
            Some(idx) if !cell(record, idx).is_empty() => amount(record, idx, &id)?,
            _ => 0,
        };

        rows.push(StripeChargeRow {
            created_date,
            amount_cents: amount(record, amount_idx, &id)?,
            fee_cents: amount(record, fee_idx, &id)?,
            customer_email: email_idx.map(|i| cell(record, i)).unwrap_or("").to_string(),
            status: cell(record, status_idx).to_string(),
            transfer: cell(record, transfer_idx).to_string(),
            amount_refunded_cents,
            id,
        });
    }
    Ok(rows)
}

/// Load observed bank deposits: `id`, optional `date`, `amount`.
pub fn load_deposits(csv_data: &str) -> Result<Vec<BankDeposit>, ReconError> {
    const SOURCE: &str = "deposits";
    let sheet = read_sheet(csv_data)?;

    let id_idx = sheet.require(SOURCE, "id")?;
    let amount_idx = sheet.require(SOURCE, "amount")?;
    let date_idx = sheet.position("date");

    let mut out = Vec::with_capacity(sheet.records.len());
    for (row_index, record) in sheet.rows() {
        let id = match cell(record, id_idx) {
            "" => format!("row {row_index}"),
            id => id.to_string(),
        };

        let date = match date_idx.map(|idx| cell(record, idx)) {
            Some(raw) if !raw.is_empty() => {
                Some(parse_date(raw).ok_or_else(|| ReconError::DateParse {
                    source: SOURCE.into(),
                    record: id.clone(),
                    value: raw.into(),
                })?)
            }
            _ => None,
        };

        let raw = cell(record, amount_idx);
        let amount_cents = parse_cents(raw).ok_or_else(|| ReconError::AmountParse {
            source: SOURCE.into(),
            record: id.clone(),
            value: raw.into(),
        })?;

        out.push(BankDeposit { id, date, amount_cents });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
