//! Project and drill files read by the command line tool.

use std::path::Path;

use anyhow::Context;
use pcbmill_core::{ExcellonObject, ExclusionArea, GeometryObject, Polygon};
use serde::{Deserialize, Serialize};

/// A geometry object with the exclusion areas of its machine setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub object: GeometryObject,
    #[serde(default)]
    pub exclusions: Vec<ExclusionArea>,
    /// Outlines that become exclusion areas with the first tool's
    /// strategy and lift height
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusion_outlines: Vec<Polygon>,
}

impl Project {
    pub fn new(object: GeometryObject) -> Self {
        Self {
            object,
            exclusions: Vec::new(),
            exclusion_outlines: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading project {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing project {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("writing project {}", path.display()))
    }

    /// All exclusion areas, outlines included
    pub fn exclusion_areas(&self) -> Vec<ExclusionArea> {
        let mut areas = self.exclusions.clone();
        let Some(first) = self.object.tools.first() else {
            return areas;
        };
        let mut next_id = areas.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        for outline in &self.exclusion_outlines {
            areas.push(ExclusionArea::with_tool_defaults(
                next_id,
                "outline",
                outline.clone(),
                &first.params,
            ));
            next_id += 1;
        }
        areas
    }
}

pub fn load_excellon(path: &Path) -> anyhow::Result<ExcellonObject> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading drill file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing drill file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcbmill_core::{ExclusionStrategy, ParamSet, ToolRecord};

    #[test]
    fn test_outlines_use_first_tool_defaults() {
        let mut object = GeometryObject::new("board", Vec::new());
        object
            .tools
            .insert(ToolRecord::new(
                1,
                0.2,
                ParamSet {
                    exclusion_strategy: ExclusionStrategy::Over,
                    exclusion_over_z: 6.0,
                    ..ParamSet::default()
                },
            ))
            .unwrap();
        let mut project = Project::new(object);
        project.exclusions.push(ExclusionArea::new(
            4,
            "clamp",
            ExclusionStrategy::Around,
            1.0,
            Polygon::rectangle(0.0, 0.0, 1.0, 1.0),
        ));
        project
            .exclusion_outlines
            .push(Polygon::rectangle(5.0, 5.0, 6.0, 6.0));

        let areas = project.exclusion_areas();
        assert_eq!(areas.len(), 2);
        assert_eq!(areas[1].id, 5);
        assert_eq!(areas[1].strategy, ExclusionStrategy::Over);
        assert_eq!(areas[1].over_z, 6.0);
    }

    #[test]
    fn test_minimal_project_json() {
        let json = r#"{
            "object": {
                "name": "board",
                "tools": [{"tool_id": 1, "diameter": 0.2}],
                "solid_geometry": [
                    {"exterior": [{"x": 0, "y": 0}, {"x": 1, "y": 0}, {"x": 1, "y": 1}]}
                ]
            }
        }"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.object.tools.len(), 1);
        assert!(project.exclusions.is_empty());
    }
}
