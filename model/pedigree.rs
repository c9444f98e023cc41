//! Pedigree coercion and recoding.
//!
//! A pedigree is a three-column individual/sire/dam table. Validators work
//! in an internal dense code space where individuals are numbered `1..=n`
//! with parents preceding offspring; a pedigree arriving in arbitrary
//! external codes is recoded and carries the external-to-internal `map` so
//! that user `id` codes can still be resolved.

use crate::data::extract_integer_column;
use crate::error::SpecError;
use ahash::AHashSet;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Code for an unknown parent.
pub const UNKNOWN_PARENT: i64 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pedigree {
    individual: Vec<i64>,
    sire: Vec<i64>,
    dam: Vec<i64>,
    /// External-to-internal code pairs, sorted by external code. Present
    /// only on recoded pedigrees.
    map: Option<Vec<(i64, i64)>>,
}

impl Pedigree {
    /// Builds a pedigree from parallel code columns. Codes must be
    /// non-negative; zero marks an unknown parent.
    pub fn from_rows(
        individual: Vec<i64>,
        sire: Vec<i64>,
        dam: Vec<i64>,
    ) -> Result<Self, SpecError> {
        if individual.len() != sire.len() || individual.len() != dam.len() {
            return Err(SpecError::TypeMismatch {
                name: "pedigree".to_string(),
                context: "pedigree construction".to_string(),
                expected: "three columns of equal length".to_string(),
                found: format!(
                    "lengths {}, {}, {}",
                    individual.len(),
                    sire.len(),
                    dam.len()
                ),
            });
        }
        for &code in individual.iter().chain(&sire).chain(&dam) {
            if code < 0 {
                return Err(SpecError::OutOfRange {
                    name: "pedigree".to_string(),
                    context: "pedigree construction".to_string(),
                    detail: format!("negative code {code}; codes must be non-negative"),
                });
            }
        }
        Ok(Self {
            individual,
            sire,
            dam,
            map: None,
        })
    }

    /// Coerces a three-column frame into a pedigree. The columns are read
    /// in order as individual, sire, dam.
    pub fn from_frame(df: &DataFrame, context: &str) -> Result<Self, SpecError> {
        if df.width() != 3 {
            return Err(SpecError::TypeMismatch {
                name: "pedigree".to_string(),
                context: context.to_string(),
                expected: "a three-column individual/sire/dam table".to_string(),
                found: format!("{} columns", df.width()),
            });
        }
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        let individual = extract_integer_column(df, &names[0], context)?;
        let sire = extract_integer_column(df, &names[1], context)?;
        let dam = extract_integer_column(df, &names[2], context)?;
        Self::from_rows(individual, sire, dam)
    }

    pub fn len(&self) -> usize {
        self.individual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individual.is_empty()
    }

    /// The set of valid internal individual codes.
    pub fn labels(&self) -> AHashSet<i64> {
        self.individual.iter().copied().collect()
    }

    pub fn map(&self) -> Option<&[(i64, i64)]> {
        self.map.as_deref()
    }

    /// Translates an external code through the map, if one is present.
    pub fn map_code(&self, external: i64) -> Option<i64> {
        match &self.map {
            Some(map) => map
                .binary_search_by_key(&external, |(ext, _)| *ext)
                .ok()
                .map(|idx| map[idx].1),
            None => Some(external),
        }
    }

    /// True when the pedigree is already in the internal code space:
    /// individuals numbered `1..=n` in order, every parent either unknown
    /// or an earlier individual.
    pub fn is_well_formed(&self) -> bool {
        let dense = self
            .individual
            .iter()
            .enumerate()
            .all(|(i, &code)| code == (i + 1) as i64);
        dense
            && self
                .individual
                .iter()
                .zip(self.sire.iter().zip(&self.dam))
                .all(|(&ind, (&sire, &dam))| {
                    (sire == UNKNOWN_PARENT || sire < ind) && (dam == UNKNOWN_PARENT || dam < ind)
                })
    }

    /// Rebuilds the pedigree in the internal dense code space. Parents
    /// referenced without a record of their own are inserted as founders;
    /// the returned pedigree carries the external-to-internal map.
    pub fn recode(&self) -> Pedigree {
        let known: AHashSet<i64> = self.individual.iter().copied().collect();

        // Referenced parents without their own record become founders.
        let mut founders: Vec<i64> = self
            .sire
            .iter()
            .chain(&self.dam)
            .copied()
            .filter(|&p| p != UNKNOWN_PARENT && !known.contains(&p))
            .collect::<AHashSet<i64>>()
            .into_iter()
            .collect();
        founders.sort_unstable();

        // Place individuals so that parents always precede offspring.
        let mut order: Vec<usize> = Vec::with_capacity(self.len());
        let mut placed: AHashSet<i64> =
            founders.iter().copied().chain([UNKNOWN_PARENT]).collect();
        let mut remaining: Vec<usize> = (0..self.len()).collect();
        while !remaining.is_empty() {
            let mut progressed = false;
            remaining.retain(|&idx| {
                let ready =
                    placed.contains(&self.sire[idx]) && placed.contains(&self.dam[idx]);
                if ready {
                    placed.insert(self.individual[idx]);
                    order.push(idx);
                    progressed = true;
                }
                !ready
            });
            if !progressed {
                // Cyclic ancestry; keep the remaining records in input order.
                order.extend(remaining.drain(..));
            }
        }

        let mut map: Vec<(i64, i64)> = Vec::with_capacity(founders.len() + self.len());
        let mut individual = Vec::with_capacity(founders.len() + self.len());
        let mut sire = Vec::with_capacity(founders.len() + self.len());
        let mut dam = Vec::with_capacity(founders.len() + self.len());

        for &founder in &founders {
            let internal = (individual.len() + 1) as i64;
            map.push((founder, internal));
            individual.push(internal);
            sire.push(UNKNOWN_PARENT);
            dam.push(UNKNOWN_PARENT);
        }
        for &idx in &order {
            let internal = (individual.len() + 1) as i64;
            map.push((self.individual[idx], internal));
            individual.push(internal);
            sire.push(self.sire[idx]);
            dam.push(self.dam[idx]);
        }
        map.sort_unstable_by_key(|(ext, _)| *ext);

        let translate = |code: i64| {
            if code == UNKNOWN_PARENT {
                UNKNOWN_PARENT
            } else {
                map[map
                    .binary_search_by_key(&code, |(ext, _)| *ext)
                    .expect("every referenced code was mapped")]
                .1
            }
        };
        for parent in sire.iter_mut().chain(dam.iter_mut()) {
            *parent = translate(*parent);
        }

        Pedigree {
            individual,
            sire,
            dam,
            map: Some(map),
        }
    }

    /// Returns a pedigree guaranteed to be in the internal code space,
    /// recoding only when necessary.
    pub fn normalized(self) -> Pedigree {
        if self.is_well_formed() {
            self
        } else {
            self.recode()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn dense_pedigree_is_well_formed() {
        let p = Pedigree::from_rows(vec![1, 2, 3], vec![0, 0, 1], vec![0, 0, 2]).unwrap();
        assert!(p.is_well_formed());
        assert!(p.map().is_none());
        assert_eq!(p.map_code(3), Some(3));
    }

    #[test]
    fn sparse_codes_are_recoded_with_map() {
        let p = Pedigree::from_rows(vec![10, 20, 30], vec![0, 0, 10], vec![0, 0, 20])
            .unwrap()
            .normalized();
        assert!(p.is_well_formed());
        assert_eq!(p.len(), 3);
        assert_eq!(p.map_code(10), Some(1));
        assert_eq!(p.map_code(30), Some(3));
        assert_eq!(p.map_code(99), None);
    }

    #[test]
    fn referenced_parent_without_record_becomes_founder() {
        // Individual 5 cites parent 7, which has no row of its own.
        let p = Pedigree::from_rows(vec![5], vec![7], vec![0]).unwrap().normalized();
        assert_eq!(p.len(), 2);
        assert!(p.is_well_formed());
        assert_eq!(p.map_code(7), Some(1));
        assert_eq!(p.map_code(5), Some(2));
    }

    #[test]
    fn offspring_listed_before_parents_are_reordered() {
        let p = Pedigree::from_rows(vec![3, 1, 2], vec![1, 0, 0], vec![2, 0, 0])
            .unwrap()
            .normalized();
        assert!(p.is_well_formed());
        // The offspring must end up with the highest internal code.
        assert_eq!(p.map_code(3), Some(3));
    }

    #[test]
    fn frame_coercion_requires_three_columns() {
        let df = df!("self" => [1i64], "sire" => [0i64]).unwrap();
        let err = Pedigree::from_frame(&df, "genetic component").unwrap_err();
        assert!(matches!(err, SpecError::TypeMismatch { .. }));
    }

    #[test]
    fn frame_coercion_reads_columns_in_order() {
        let df = df!(
            "self" => [1i64, 2, 3],
            "sire" => [0i64, 0, 1],
            "dam" => [0i64, 0, 2]
        )
        .unwrap();
        let p = Pedigree::from_frame(&df, "genetic component").unwrap();
        assert!(p.is_well_formed());
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn negative_codes_are_rejected() {
        let err = Pedigree::from_rows(vec![1], vec![-2], vec![0]).unwrap_err();
        assert!(matches!(err, SpecError::OutOfRange { .. }));
    }
}
