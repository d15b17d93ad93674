use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::models::content::ContentBundle;
use crate::models::injection::AnatomyRegion;
use crate::models::quiz::QuestionBank;
use crate::services::decision_tree_service::DecisionTree;

/// Read-only source of authored training content.
pub trait ContentRepository: Send + Sync {
    fn anatomy_region(&self, name: &str) -> EngineResult<AnatomyRegion>;

    fn case_study(&self, case_id: &str) -> EngineResult<DecisionTree>;

    /// Question bank for a quiz category.
    fn question_bank(&self, category: &str) -> EngineResult<QuestionBank>;

    fn case_study_ids(&self) -> Vec<String>;

    fn categories(&self) -> Vec<String>;
}

/// Content held in memory, checked once when loaded.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContentRepository {
    regions: HashMap<String, AnatomyRegion>,
    case_studies: HashMap<String, DecisionTree>,
    question_banks: HashMap<String, QuestionBank>,
}

impl InMemoryContentRepository {
    pub fn from_bundle(bundle: ContentBundle) -> EngineResult<Self> {
        let mut repo = Self::default();

        for region in bundle.anatomy_regions {
            for site in &region.injection_sites {
                site.validate_content()?;
            }
            let name = region.name.clone();
            if repo.regions.insert(name.clone(), region).is_some() {
                return Err(EngineError::malformed(format!(
                    "anatomy region `{}` is defined twice",
                    name
                )));
            }
        }

        for record in bundle.case_studies {
            let tree = DecisionTree::new(record)?;
            let case_id = tree.case_id().to_string();
            if repo.case_studies.insert(case_id.clone(), tree).is_some() {
                return Err(EngineError::malformed(format!(
                    "case study `{}` is defined twice",
                    case_id
                )));
            }
        }

        for bank in bundle.question_banks {
            if bank.questions.is_empty() {
                return Err(EngineError::malformed(format!(
                    "question bank `{}` has no questions",
                    bank.id
                )));
            }
            let category = bank.category.clone();
            if repo.question_banks.insert(category.clone(), bank).is_some() {
                return Err(EngineError::malformed(format!(
                    "quiz category `{}` has more than one question bank",
                    category
                )));
            }
        }

        tracing::info!(
            "Content loaded: regions={}, case_studies={}, question_banks={}",
            repo.regions.len(),
            repo.case_studies.len(),
            repo.question_banks.len()
        );
        Ok(repo)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let bundle: ContentBundle =
            serde_json::from_str(json).context("Failed to parse content bundle")?;
        Self::from_bundle(bundle).context("Content bundle failed validation")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read content bundle {}", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("Failed to load content bundle {}", path.display()))
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}

impl ContentRepository for InMemoryContentRepository {
    fn anatomy_region(&self, name: &str) -> EngineResult<AnatomyRegion> {
        self.regions
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::NotFound {
                kind: "anatomy region",
                id: name.to_string(),
            })
    }

    fn case_study(&self, case_id: &str) -> EngineResult<DecisionTree> {
        self.case_studies
            .get(case_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound {
                kind: "case study",
                id: case_id.to_string(),
            })
    }

    fn question_bank(&self, category: &str) -> EngineResult<QuestionBank> {
        self.question_banks
            .get(category)
            .cloned()
            .ok_or_else(|| EngineError::NotFound {
                kind: "question bank",
                id: category.to_string(),
            })
    }

    fn case_study_ids(&self) -> Vec<String> {
        sorted_keys(&self.case_studies)
    }

    fn categories(&self) -> Vec<String> {
        sorted_keys(&self.question_banks)
    }
}
