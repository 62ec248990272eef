//! Categorical alignment: maps request values onto the category codes the
//! model saw at training time.
//!
//! Each categorical column has a [`CategoryTable`] built from the ordered
//! category list stored in the bundle. A value's code is its position in that
//! list. Values outside the list are [`Category::Unknown`] and reach the model
//! as a missing value (`NaN`); they are never rejected.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use serde::Deserialize;
use serde_json::Value;

use crate::bundle::BundleError;
use crate::types::FlightInformation;

pub const FEATURE_COUNT: usize = 8;

/// Column order of the training frame.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "DIA",
    "MES",
    "DIANOM",
    "TIPOVUELO",
    "OPERA",
    "SIGLADES",
    "TEMPORADAALTA",
    "PERIODODIA",
];

const TEMPORADAALTA_COLUMN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Known(u32),
    Unknown,
}

impl Category {
    pub fn as_feature(self) -> f64 {
        match self {
            Category::Known(code) => f64::from(code),
            Category::Unknown => f64::NAN,
        }
    }
}

/// Ordered training-time categories for one column.
#[derive(Debug, Clone)]
pub struct CategoryTable<T> {
    field: &'static str,
    values: Vec<T>,
    codes: HashMap<T, u32>,
}

impl<T> CategoryTable<T>
where
    T: Eq + Hash + Clone + Display,
{
    pub fn new(field: &'static str, values: Vec<T>) -> Result<Self, BundleError> {
        let mut codes = HashMap::with_capacity(values.len());
        for (code, value) in values.iter().enumerate() {
            let code = u32::try_from(code).map_err(|_| BundleError::TooManyCategories { field })?;
            if codes.insert(value.clone(), code).is_some() {
                return Err(BundleError::DuplicateCategory { field, value: value.to_string() });
            }
        }
        Ok(Self { field, values, codes })
    }

    pub fn encode<Q>(&self, value: &Q) -> Category
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.codes.get(value) {
            Some(&code) => Category::Known(code),
            None => Category::Unknown,
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    /// Same categories in the same order as `training`.
    fn matches_training(&self, training: &[Value]) -> bool
    where
        T: Into<Value>,
    {
        self.values.len() == training.len()
            && self.values.iter().zip(training).all(|(v, t)| {
                let v: Value = v.clone().into();
                v == *t
            })
    }
}

/// Category lists as stored in the bundle file.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryVocabulary {
    pub dia_values: Vec<i64>,
    pub mes_values: Vec<i64>,
    pub dianom_values: Vec<String>,
    pub tipovuelo_values: Vec<String>,
    pub opera_values: Vec<String>,
    pub siglades_values: Vec<String>,
    pub periododia_values: Vec<String>,
}

/// A single encoded request, in training column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub values: [f64; FEATURE_COUNT],
    /// Columns whose value was not seen at training time.
    pub unknown: Vec<&'static str>,
}

impl FeatureRow {
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}

#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    dia: CategoryTable<i64>,
    mes: CategoryTable<i64>,
    dianom: CategoryTable<String>,
    tipovuelo: CategoryTable<String>,
    opera: CategoryTable<String>,
    siglades: CategoryTable<String>,
    periododia: CategoryTable<String>,
}

impl FeatureEncoder {
    pub fn from_vocabulary(vocab: CategoryVocabulary) -> Result<Self, BundleError> {
        Ok(Self {
            dia: CategoryTable::new("DIA", vocab.dia_values)?,
            mes: CategoryTable::new("MES", vocab.mes_values)?,
            dianom: CategoryTable::new("DIANOM", vocab.dianom_values)?,
            tipovuelo: CategoryTable::new("TIPOVUELO", vocab.tipovuelo_values)?,
            opera: CategoryTable::new("OPERA", vocab.opera_values)?,
            siglades: CategoryTable::new("SIGLADES", vocab.siglades_values)?,
            periododia: CategoryTable::new("PERIODODIA", vocab.periododia_values)?,
        })
    }

    pub fn encode(&self, flight: &FlightInformation) -> FeatureRow {
        let categorical = [
            (0, self.dia.field(), self.dia.encode(&flight.dia)),
            (1, self.mes.field(), self.mes.encode(&flight.mes)),
            (2, self.dianom.field(), self.dianom.encode(flight.dianom.as_str())),
            (3, self.tipovuelo.field(), self.tipovuelo.encode(flight.tipovuelo.as_str())),
            (4, self.opera.field(), self.opera.encode(flight.opera.as_str())),
            (5, self.siglades.field(), self.siglades.encode(flight.siglades.as_str())),
            (7, self.periododia.field(), self.periododia.encode(flight.periododia.as_str())),
        ];

        let mut values = [0.0; FEATURE_COUNT];
        let mut unknown = Vec::new();
        for (column, field, category) in categorical {
            if category == Category::Unknown {
                unknown.push(field);
            }
            values[column] = category.as_feature();
        }
        values[TEMPORADAALTA_COLUMN] = flight.temporadaalta as f64;

        FeatureRow { values, unknown }
    }

    /// Checks each table against the training-time lists recorded with the
    /// classifier, in categorical column order.
    pub fn check_training_categories(&self, training: &[Vec<Value>]) -> Result<(), BundleError> {
        if training.len() != 7 {
            return Err(BundleError::TrainingCategoryCount { found: training.len(), expected: 7 });
        }
        let checks = [
            (self.dia.field(), self.dia.matches_training(&training[0])),
            (self.mes.field(), self.mes.matches_training(&training[1])),
            (self.dianom.field(), self.dianom.matches_training(&training[2])),
            (self.tipovuelo.field(), self.tipovuelo.matches_training(&training[3])),
            (self.opera.field(), self.opera.matches_training(&training[4])),
            (self.siglades.field(), self.siglades.matches_training(&training[5])),
            (self.periododia.field(), self.periododia.matches_training(&training[6])),
        ];
        match checks.into_iter().find(|(_, ok)| !ok) {
            Some((field, _)) => Err(BundleError::VocabularyMismatch { field }),
            None => Ok(()),
        }
    }

    /// `(column, number of categories)` for each categorical column.
    pub fn table_sizes(&self) -> [(&'static str, usize); 7] {
        [
            (self.dia.field(), self.dia.len()),
            (self.mes.field(), self.mes.len()),
            (self.dianom.field(), self.dianom.len()),
            (self.tipovuelo.field(), self.tipovuelo.len()),
            (self.opera.field(), self.opera.len()),
            (self.siglades.field(), self.siglades.len()),
            (self.periododia.field(), self.periododia.len()),
        ]
    }
}
