//! Named scene collection with a notion of the "active" scene.

use std::collections::BTreeMap;

use tracing::info;

use crate::error::SceneError;
use crate::scene::Scene;

/// Scene used when no main scene has been chosen.
pub const DEFAULT_SCENE_NAME: &str = "server";

/// Owns every scene of the process.
#[derive(Debug, Default)]
pub struct SceneManager {
    scenes: BTreeMap<String, Scene>,
    main: Option<String>,
}

impl SceneManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scene.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::DuplicateScene`] if a scene with this name exists.
    pub fn add_scene(&mut self, scene: Scene) -> Result<&mut Scene, SceneError> {
        let name = scene.name().to_string();
        if self.scenes.contains_key(&name) {
            return Err(SceneError::DuplicateScene(name));
        }
        info!(scene = %name, "scene added");
        Ok(self.scenes.entry(name).or_insert(scene))
    }

    /// Remove a scene by name. Clears the main selection if it pointed there.
    pub fn remove_scene(&mut self, name: &str) -> Option<Scene> {
        let scene = self.scenes.remove(name)?;
        if self.main.as_deref() == Some(name) {
            self.main = None;
        }
        info!(scene = %name, "scene removed");
        Some(scene)
    }

    #[must_use]
    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    pub fn scene_mut(&mut self, name: &str) -> Option<&mut Scene> {
        self.scenes.get_mut(name)
    }

    /// Mark a scene as the main (viewed) scene. Returns `false` if no scene
    /// has this name.
    pub fn set_main_scene(&mut self, name: &str) -> bool {
        if !self.scenes.contains_key(name) {
            return false;
        }
        self.main = Some(name.to_string());
        true
    }

    #[must_use]
    pub fn main_scene_name(&self) -> Option<&str> {
        self.main.as_deref()
    }

    /// The scene requests operate on: the main scene if set, otherwise the
    /// scene named [`DEFAULT_SCENE_NAME`].
    pub fn active_scene_mut(&mut self) -> Option<&mut Scene> {
        let name = self.main.as_deref().unwrap_or(DEFAULT_SCENE_NAME);
        self.scenes.get_mut(name)
    }

    /// Read-only counterpart of [`SceneManager::active_scene_mut`].
    #[must_use]
    pub fn active_scene(&self) -> Option<&Scene> {
        let name = self.main.as_deref().unwrap_or(DEFAULT_SCENE_NAME);
        self.scenes.get(name)
    }

    /// Scene names in sorted order.
    pub fn scene_names(&self) -> impl Iterator<Item = &str> {
        self.scenes.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_scene_falls_back_to_default_name() {
        let mut manager = SceneManager::new();
        assert!(manager.active_scene().is_none());

        manager.add_scene(Scene::new("lobby")).unwrap();
        assert!(manager.active_scene().is_none());

        manager.add_scene(Scene::new(DEFAULT_SCENE_NAME)).unwrap();
        assert_eq!(manager.active_scene().unwrap().name(), DEFAULT_SCENE_NAME);
    }

    #[test]
    fn test_main_scene_takes_precedence() {
        let mut manager = SceneManager::new();
        manager.add_scene(Scene::new(DEFAULT_SCENE_NAME)).unwrap();
        manager.add_scene(Scene::new("lobby")).unwrap();

        assert!(manager.set_main_scene("lobby"));
        assert_eq!(manager.active_scene_mut().unwrap().name(), "lobby");
        assert!(!manager.set_main_scene("missing"));
        assert_eq!(manager.main_scene_name(), Some("lobby"));
    }

    #[test]
    fn test_removing_main_scene_clears_selection() {
        let mut manager = SceneManager::new();
        manager.add_scene(Scene::new("lobby")).unwrap();
        manager.set_main_scene("lobby");
        manager.remove_scene("lobby").unwrap();
        assert!(manager.main_scene_name().is_none());
    }

    #[test]
    fn test_duplicate_scene_rejected() {
        let mut manager = SceneManager::new();
        manager.add_scene(Scene::new("lobby")).unwrap();
        assert!(matches!(
            manager.add_scene(Scene::new("lobby")),
            Err(SceneError::DuplicateScene(_))
        ));
    }
}
