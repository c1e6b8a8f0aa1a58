//! Host tick loop.
//!
//! Each tick pumps the HTTP module once, so scene requests are answered on
//! the thread that owns the scenes and at most at the tick rate.

use std::time::{Duration, Instant};

use engine_scene::SceneManager;
use tokio::signal;
use tracing::{debug, info, warn};

use crate::module::HttpServerModule;

/// Configuration for the host tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

impl TickConfig {
    fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(f64::EPSILON))
    }
}

/// The host's tick loop state.
pub struct TickLoop {
    tick_id: u64,
    config: TickConfig,
    scenes: SceneManager,
    http: HttpServerModule,
}

impl TickLoop {
    #[must_use]
    pub fn new(config: TickConfig, scenes: SceneManager, http: HttpServerModule) -> Self {
        Self {
            tick_id: 0,
            config,
            scenes,
            http,
        }
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    #[must_use]
    pub fn scenes(&self) -> &SceneManager {
        &self.scenes
    }

    pub fn scenes_mut(&mut self) -> &mut SceneManager {
        &mut self.scenes
    }

    pub fn http_mut(&mut self) -> &mut HttpServerModule {
        &mut self.http
    }

    /// Run one tick.
    pub fn tick(&mut self) {
        self.tick_id += 1;
        let handled = self.http.update(&mut self.scenes);
        if handled > 0 {
            debug!(tick_id = self.tick_id, handled, "answered HTTP requests");
        }
    }

    fn limit_reached(&self) -> bool {
        self.config.max_ticks > 0 && self.tick_id >= self.config.max_ticks
    }

    fn check_budget(&self, elapsed: Duration, budget: Duration) {
        if elapsed > budget {
            warn!(
                tick_id = self.tick_id,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = budget.as_millis() as u64,
                "tick exceeded time budget"
            );
        }
    }

    /// Blocking loop for the configured number of ticks, or indefinitely.
    pub fn run(&mut self) {
        let tick_duration = self.config.tick_duration();
        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();
            self.tick();
            if self.limit_reached() {
                info!(ticks = self.tick_id, "tick loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                self.check_budget(elapsed, tick_duration);
            }
        }
    }

    /// Async loop driven by a tokio interval; stops on Ctrl+C or when the
    /// tick limit is reached.
    pub async fn run_async(&mut self) {
        let tick_duration = self.config.tick_duration();
        let mut interval = tokio::time::interval(tick_duration);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!(ticks = self.tick_id, "received shutdown signal");
                    break;
                }
                _ = interval.tick() => {
                    let start = Instant::now();
                    self.tick();
                    self.check_budget(start.elapsed(), tick_duration);
                    if self.limit_reached() {
                        info!(ticks = self.tick_id, "tick loop complete");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_http::{HttpRequest, Method, Reply, ServerConfig};
    use engine_scene::{DEFAULT_SCENE_NAME, Scene};

    fn tick_loop(config: TickConfig) -> TickLoop {
        let mut scenes = SceneManager::new();
        scenes.add_scene(Scene::new(DEFAULT_SCENE_NAME)).unwrap();
        TickLoop::new(config, scenes, HttpServerModule::new(None, ServerConfig::default()))
    }

    #[test]
    fn test_tick_advances_counter() {
        let mut tick_loop = tick_loop(TickConfig::default());
        assert_eq!(tick_loop.tick_id(), 0);
        tick_loop.tick();
        tick_loop.tick();
        assert_eq!(tick_loop.tick_id(), 2);
    }

    #[test]
    fn test_run_limited_ticks() {
        let mut tick_loop = tick_loop(TickConfig {
            tick_rate: 1000.0,
            max_ticks: 5,
        });
        tick_loop.run();
        assert_eq!(tick_loop.tick_id(), 5);
    }

    #[tokio::test]
    async fn test_run_async_limited_ticks() {
        let mut tick_loop = tick_loop(TickConfig {
            tick_rate: 1000.0,
            max_ticks: 3,
        });
        tick_loop.run_async().await;
        assert_eq!(tick_loop.tick_id(), 3);
    }

    #[test]
    fn test_scenes_reachable_through_server() {
        let mut tick_loop = tick_loop(TickConfig::default());
        let TickLoop { scenes, http, .. } = &mut tick_loop;
        let reply = http
            .server_mut()
            .handle(scenes, &HttpRequest::new(Method::Post, "/entities"));
        assert!(reply.is_success());
        assert_eq!(tick_loop.scenes().active_scene().unwrap().entity_count(), 1);
        assert_ne!(reply, Reply::not_found());
    }
}
