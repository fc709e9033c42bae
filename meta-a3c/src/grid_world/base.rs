use super::GridWorldConfig;
use anyhow::{bail, Result};
use log::info;
use meta_a3c_core::{record::Record, Env, Step};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Navigation to a goal cell in a 2D grid.
pub struct GridWorld {
    config: GridWorldConfig,
    pos: (usize, usize),
    goal: (usize, usize),
    t: usize,
    rng: StdRng,
}

impl GridWorld {
    /// Current position of the agent.
    pub fn pos(&self) -> (usize, usize) {
        self.pos
    }

    /// Current goal position.
    pub fn goal(&self) -> (usize, usize) {
        self.goal
    }

    fn random_cell(&mut self) -> (usize, usize) {
        (
            self.rng.gen_range(0..self.config.width),
            self.rng.gen_range(0..self.config.height),
        )
    }

    /// A random cell other than `cell`.
    fn random_cell_except(&mut self, cell: (usize, usize)) -> (usize, usize) {
        loop {
            let c = self.random_cell();
            if c != cell {
                return c;
            }
        }
    }

    fn obs(&self) -> Vec<f32> {
        let (w, h) = (self.config.width, self.config.height);
        let mut obs = vec![0f32; 2 * w * h];
        obs[self.pos.1 * w + self.pos.0] = 1.0;
        obs[w * h + self.goal.1 * w + self.goal.0] = 1.0;
        obs
    }
}

impl Env for GridWorld {
    type Config = GridWorldConfig;
    type Obs = Vec<f32>;

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        let (w, h) = (config.width, config.height);
        if w * h < 2 {
            bail!("Grid of size {}x{} has no room for a goal", w, h);
        }
        if config.goal.0 >= w || config.goal.1 >= h {
            bail!("Goal {:?} is outside of the {}x{} grid", config.goal, w, h);
        }
        if !config.random_start && !config.random_goal && config.goal == (0, 0) {
            bail!("Goal is at the start position");
        }

        Ok(Self {
            config: config.clone(),
            pos: (0, 0),
            goal: config.goal,
            t: 0,
            rng: StdRng::seed_from_u64(seed as u64),
        })
    }

    fn reset(&mut self) -> Result<Vec<f32>> {
        self.t = 0;
        self.goal = match self.config.random_goal {
            true => self.random_cell(),
            false => self.config.goal,
        };
        self.pos = match self.config.random_start {
            true => self.random_cell_except(self.goal),
            false => (0, 0),
        };
        if self.pos == self.goal {
            self.goal = self.random_cell_except(self.pos);
        }
        Ok(self.obs())
    }

    fn step(&mut self, action: usize) -> Result<Step<Self>> {
        let (x, y) = self.pos;
        self.pos = match action {
            0 => (x, y.saturating_sub(1)),
            1 => (x, (y + 1).min(self.config.height - 1)),
            2 => (x.saturating_sub(1), y),
            3 => ((x + 1).min(self.config.width - 1), y),
            _ => bail!("Invalid action {}", action),
        };
        self.t += 1;

        let reached = self.pos == self.goal;
        let reward = match reached {
            true => self.config.goal_reward,
            false => self.config.step_reward,
        };
        Ok(Step::new(self.obs(), reward, reached, Record::empty()))
    }

    fn n_actions(&self) -> usize {
        4
    }

    fn max_episode_steps(&self) -> Option<usize> {
        Some(self.config.max_steps)
    }

    fn render(&mut self) -> Result<()> {
        let mut rows = Vec::with_capacity(self.config.height);
        for y in 0..self.config.height {
            let row = (0..self.config.width)
                .map(|x| match (x, y) {
                    p if p == self.pos => 'A',
                    p if p == self.goal => 'G',
                    _ => '.',
                })
                .collect::<String>();
            rows.push(row);
        }
        info!("t = {}\n{}", self.t, rows.join("\n"));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    fn argmax_of(obs: &[f32], offset: usize, n: usize) -> usize {
        (0..n).find(|&i| obs[offset + i] == 1.0).unwrap()
    }

    #[test]
    fn test_reach_goal_in_corner() -> Result<()> {
        let config = GridWorldConfig::default().size(3, 2);
        let mut env = GridWorld::build(&config, 0)?;
        let obs = env.reset()?;
        assert_eq!(obs.len(), config.obs_dim());
        assert_eq!(argmax_of(&obs, 0, 6), 0);
        assert_eq!(argmax_of(&obs, 6, 6), 5);

        // Bumping into the wall
        let step = env.step(0)?;
        assert_eq!(env.pos(), (0, 0));
        assert_eq!(step.reward, -0.01);
        assert!(!step.is_terminated);

        env.step(3)?;
        env.step(3)?;
        let step = env.step(1)?;
        assert_eq!(env.pos(), (2, 1));
        assert_eq!(step.reward, 1.0);
        assert!(step.is_terminated);
        assert_eq!(argmax_of(&step.obs, 0, 6), 5);
        Ok(())
    }

    #[test]
    fn test_invalid_configs_and_actions() -> Result<()> {
        assert!(GridWorld::build(&GridWorldConfig::default().goal(5, 0), 0).is_err());
        assert!(GridWorld::build(&GridWorldConfig::default().goal(0, 0), 0).is_err());
        assert!(GridWorld::build(&GridWorldConfig::default().size(1, 1), 0).is_err());

        let mut env = GridWorld::build(&GridWorldConfig::default(), 0)?;
        env.reset()?;
        assert!(env.step(4).is_err());
        Ok(())
    }

    #[test]
    fn test_random_goal_differs_from_start() -> Result<()> {
        let config = GridWorldConfig::default()
            .size(2, 2)
            .random_goal(true)
            .random_start(true);
        let mut env = GridWorld::build(&config, 7)?;
        for _ in 0..50 {
            env.reset()?;
            assert_ne!(env.pos(), env.goal());
        }
        Ok(())
    }

    #[test]
    fn test_serde_config() -> Result<()> {
        let config = GridWorldConfig::default().size(7, 3).max_steps(30);
        let dir = TempDir::new("grid_world")?;
        let path = dir.path().join("env.yaml");
        config.save(&path)?;
        assert_eq!(GridWorldConfig::load(&path)?, config);
        Ok(())
    }
}
