use anyhow::{Context, Result};
use bigram_lm::{
    config::Args,
    dataset::{load_corpus, split_tokens},
    device,
    generate::BigramGenerator,
    tokenizer::Tokenizer,
    train::BigramTrainer,
};
use clap::Parser;
use log::{debug, info};

fn main() -> Result<()> {
    let args = Args::parse();
    args.log.setup_logging(3)?;
    let config = args.train_config().context("invalid configuration")?;

    let device = device::resolve_device(args.device, args.cuda_lib.as_deref())
        .context("failed to resolve device")?;
    // Seeds libtorch's generator, used by multinomial sampling.
    tch::manual_seed(config.seed as i64);

    let text = load_corpus(&args.input)
        .with_context(|| format!("failed to read corpus {}", args.input.display()))?;
    let tokenizer = Tokenizer::from_corpus(&text).context("failed to build vocabulary")?;
    let tokens = tokenizer.encode(&text)?;
    info!(
        "corpus: {} characters, vocabulary of {}",
        tokens.len(),
        tokenizer.vocab_size()
    );
    debug!("alphabet: {:?}", tokenizer.chars());

    let (train, val) = split_tokens(&tokens, config.train_split)?;
    let mut trainer = BigramTrainer::new(device, tokenizer.vocab_size(), train, val, &config)
        .context("failed to create trainer")?;
    trainer.train().context("training failed")?;

    let generator = BigramGenerator::new(device, trainer.model(), &tokenizer);
    let sample = match &args.prompt {
        Some(prompt) => format!("{}{}", prompt, generator.prompt(prompt, config.generate_tokens)?),
        None => generator.sample(config.block_size, config.generate_tokens)?,
    };
    println!("{}", sample);
    Ok(())
}
