//! Train hierarchical actor-critic agents in a grid world.
use anyhow::Result;
use clap::Parser;
use meta_a3c::{GridWorld, GridWorldConfig};
use meta_a3c_async_trainer::{
    util::{train_async, TrainAsyncConfigs},
    ActorManagerConfig, AsyncTrainStat, AsyncTrainerConfig, Evaluator, EvaluatorConfig,
    ParameterSync, WorkerConfig,
};
use meta_a3c_candle_agent::{OptimizerConfig, RecurrentActorCritic, RecurrentActorCriticConfig};
use meta_a3c_core::{params::ParameterSet, Configurable, Env as _};

type Env = GridWorld;
type Policy = RecurrentActorCritic;
type Optimizer = meta_a3c_candle_agent::Optimizer;

mod config {
    use super::*;

    pub fn env_config(args: &Args) -> GridWorldConfig {
        GridWorldConfig::default()
            .size(args.width, args.height)
            .random_goal(args.random_goal)
            .max_steps(args.max_steps)
    }

    pub fn policy_config(env_config: &GridWorldConfig, args: &Args) -> RecurrentActorCriticConfig {
        RecurrentActorCriticConfig::default()
            .obs_dim(env_config.obs_dim())
            .feature_units(vec![args.hidden])
            .feature_dim(args.n_options)
            .lstm_dim(args.hidden)
            .n_actions(4)
            .context_dim(args.n_options)
    }

    pub fn meta_policy_config(
        env_config: &GridWorldConfig,
        args: &Args,
    ) -> RecurrentActorCriticConfig {
        RecurrentActorCriticConfig::default()
            .obs_dim(env_config.obs_dim())
            .feature_units(vec![args.hidden])
            .feature_dim(args.hidden)
            .lstm_dim(args.hidden)
            .n_actions(args.n_options)
            .context_dim(0)
    }

    pub fn worker_config(args: &Args) -> WorkerConfig {
        WorkerConfig::default()
            .sub_horizon(args.sub_horizon)
            .meta_horizon(args.meta_horizon)
    }

    pub fn async_trainer_config(args: &Args) -> AsyncTrainerConfig {
        AsyncTrainerConfig::default()
            .model_dir(args.model_dir.clone())
            .max_global_steps(args.max_global_steps)
            .eval_interval(args.eval_interval)
            .save_interval(args.eval_interval)
    }

    pub fn show_config(args: &Args) -> Result<()> {
        let env_config = env_config(args);
        println!("### env_config");
        println!("{}", serde_yaml::to_string(&env_config)?);
        println!("### policy_config");
        println!("{}", serde_yaml::to_string(&policy_config(&env_config, args))?);
        println!("### meta_policy_config");
        println!(
            "{}",
            serde_yaml::to_string(&meta_policy_config(&env_config, args))?
        );
        println!("### worker_config");
        println!("{}", serde_yaml::to_string(&worker_config(args))?);
        println!("### trainer_config");
        println!("{}", serde_yaml::to_string(&async_trainer_config(args))?);
        Ok(())
    }
}

/// Train hierarchical actor-critic agents in a grid world
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
struct Args {
    /// Directory of tensorboard logs and parameter snapshots
    #[arg(long, default_value = "./meta-a3c/examples/model/grid_world")]
    model_dir: String,

    /// Number of workers
    #[arg(long, default_value_t = 4)]
    n_workers: usize,

    /// Number of options
    #[arg(long, default_value_t = 4)]
    n_options: usize,

    /// Width of the grid
    #[arg(long, default_value_t = 5)]
    width: usize,

    /// Height of the grid
    #[arg(long, default_value_t = 5)]
    height: usize,

    /// Draw the goal at random in every episode
    #[arg(long, default_value_t = false)]
    random_goal: bool,

    /// Episode step limit
    #[arg(long, default_value_t = 100)]
    max_steps: usize,

    /// Size of hidden layers and LSTM state
    #[arg(long, default_value_t = 64)]
    hidden: usize,

    /// Maximum number of steps of a sub rollout
    #[arg(long, default_value_t = 100)]
    sub_horizon: usize,

    /// Maximum number of options of a meta rollout
    #[arg(long, default_value_t = 20)]
    meta_horizon: usize,

    /// Learning rate
    #[arg(long, default_value_t = 1e-4)]
    lr: f64,

    /// Number of environment steps of training
    #[arg(long, default_value_t = 1_000_000)]
    max_global_steps: u64,

    /// Interval of evaluation and saving in environment steps
    #[arg(long, default_value_t = 100_000)]
    eval_interval: u64,

    /// Number of episodes of each evaluation
    #[arg(long, default_value_t = 20)]
    eval_episodes: usize,

    /// Evaluate the final snapshot in `model_dir` instead of training
    #[arg(long, default_value_t = false)]
    eval: bool,

    /// Render the environment in evaluation
    #[arg(long, default_value_t = false)]
    render: bool,

    /// Show config
    #[arg(long, default_value_t = false)]
    show_config: bool,
}

fn train(args: &Args) -> Result<AsyncTrainStat> {
    let env_config = config::env_config(args);
    let policy_configs = (0..args.n_workers)
        .map(|ix| config::policy_config(&env_config, args).seed(ix as u64))
        .collect::<Vec<_>>();
    let meta_policy_configs = (0..args.n_workers)
        .map(|ix| config::meta_policy_config(&env_config, args).seed(1000 + ix as u64))
        .collect::<Vec<_>>();
    let opt_config = OptimizerConfig::Adam { lr: args.lr };
    let worker_config = config::worker_config(args);
    let actor_man_config = ActorManagerConfig::default();
    let async_trainer_config = config::async_trainer_config(args);
    let evaluator_config = EvaluatorConfig::default().n_episodes(args.eval_episodes);

    let configs = TrainAsyncConfigs::<Env, Policy, Policy, Optimizer> {
        policy_configs: &policy_configs,
        meta_policy_configs: &meta_policy_configs,
        env_config_train: &env_config,
        env_config_eval: &env_config,
        opt_config: &opt_config,
        worker_config: &worker_config,
        actor_man_config: &actor_man_config,
        async_trainer_config: &async_trainer_config,
        evaluator_config: &evaluator_config,
    };
    train_async(&args.model_dir, &configs)
}

/// Loads the final snapshot of the shared parameters.
fn load_final(model_dir: &str) -> Result<ParameterSync> {
    let dir = std::path::Path::new(model_dir).join("final");
    let sub = ParameterSet::load(dir.join("sub.bin"))?;
    let meta = ParameterSet::load(dir.join("meta.bin"))?;
    let target = ParameterSet::load(dir.join("target.bin"))?;
    ParameterSync::from_sets(&sub, &meta, &target)
}

fn eval(args: &Args) -> Result<()> {
    let env_config = config::env_config(args);
    let sync = load_final(&args.model_dir)?;

    let mut evaluator = Evaluator::new(
        &EvaluatorConfig::default()
            .n_episodes(args.eval_episodes)
            .render(args.render),
        &config::worker_config(args),
        Env::build(&env_config, 0)?,
        Policy::build(config::policy_config(&env_config, args))?,
        Policy::build(config::meta_policy_config(&env_config, args))?,
        sync,
    )?;
    let record = evaluator.evaluate()?;
    for key in ["Eval/Average_Reward", "Eval/SD_Reward", "Eval/Average_Length"] {
        println!("{}: {:.3}", key, record.get_scalar(key)?);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.show_config {
        config::show_config(&args)?;
    } else if args.eval {
        eval(&args)?;
    } else {
        let stats = train(&args)?;
        println!("{}", stats.fmt());
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use meta_a3c_candle_agent::actor_critic::FEATURE_PREFIX;
    use std::path::Path;
    use tempdir::TempDir;

    #[test_log::test]
    fn test_grid_world_training() -> Result<()> {
        let tmp_dir = TempDir::new("grid_world")?;
        let model_dir = tmp_dir.path().to_str().unwrap().to_string();
        let args = Args {
            model_dir: model_dir.clone(),
            n_workers: 2,
            n_options: 3,
            width: 3,
            height: 3,
            random_goal: false,
            max_steps: 20,
            hidden: 16,
            sub_horizon: 10,
            meta_horizon: 4,
            lr: 1e-3,
            max_global_steps: 400,
            eval_interval: 200,
            eval_episodes: 2,
            eval: false,
            render: false,
            show_config: false,
        };

        let stats = train(&args)?;
        assert!(stats.global_step >= 400);
        assert!(stats.n_evals >= 1);
        let final_dir = Path::new(&model_dir).join("final");
        for name in ["sub.bin", "meta.bin", "target.bin"] {
            assert!(final_dir.join(name).exists());
        }

        // Evaluation uses the saved target network, not the sub features
        let saved_target = ParameterSet::load(final_dir.join("target.bin"))?;
        let sync = load_final(&model_dir)?;
        assert_eq!(sync.pull_target(), saved_target);
        assert_eq!(
            sync.pull_sub().filter_prefix(FEATURE_PREFIX).layout,
            saved_target.layout
        );

        eval(&Args {
            render: true,
            ..args
        })?;
        Ok(())
    }
}
