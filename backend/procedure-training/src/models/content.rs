use serde::{Deserialize, Serialize};

use super::case_study::CaseStudyRecord;
use super::injection::AnatomyRegion;
use super::quiz::QuestionBank;

/// Authored training content as shipped in one JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContentBundle {
    #[serde(default)]
    pub anatomy_regions: Vec<AnatomyRegion>,
    #[serde(default)]
    pub case_studies: Vec<CaseStudyRecord>,
    #[serde(default)]
    pub question_banks: Vec<QuestionBank>,
}
