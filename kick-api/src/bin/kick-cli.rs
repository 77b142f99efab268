use eyre::{Context, bail};
use kick_api::{
    AuthMode, ChannelFilter, ChannelLookup, ChatMessage, ClientConfig, KickClient,
    LivestreamQuery, LivestreamSort,
};
use std::io::IsTerminal;
use tokio::io::AsyncBufReadExt;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: kick-cli <command> [args]

commands:
  categories <query> [page]     search categories
  livestreams [category-id]     list live streams, most viewers first
  channel <slug>                show one channel
  chat <message>                post a chat message (as the bot, or as the user once authorized)
  introspect                    show what Kick knows about the current token

Configuration comes from KICK_CLIENT_ID, KICK_CLIENT_SECRET and, for user access,
KICK_REDIRECT_URI. With a redirect URI the CLI walks through authorization first.";

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stdout().is_terminal())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{USAGE}");
        return Ok(());
    };

    let config = ClientConfig::from_env().context("load configuration")?;
    let client = KickClient::new(config).context("construct client")?;
    if client.config().auth_mode() == AuthMode::AuthorizationCode {
        authorize(&client).await.context("authorize")?;
    }

    match (command.as_str(), &args[1..]) {
        ("categories", [query, rest @ ..]) => {
            let page = match rest.first() {
                Some(page) => page.parse().context("parse page number")?,
                None => 1,
            };
            for category in client.search_categories(query, page).await? {
                println!("{:>8}  {}", category.id, category.name);
            }
        }
        ("livestreams", rest) => {
            let category_id = match rest.first() {
                Some(id) => Some(id.parse().context("parse category id")?),
                None => None,
            };
            let query = LivestreamQuery {
                category_id,
                limit: Some(25),
                sort: Some(LivestreamSort::ViewerCount),
                ..Default::default()
            };
            for stream in client.list_livestreams(&query).await? {
                println!(
                    "{:>7}  {:<25} {}",
                    stream.viewer_count, stream.slug, stream.stream_title
                );
            }
        }
        ("channel", [slug]) => {
            let channel = client
                .get_channel(ChannelLookup::Slug(slug.clone()))
                .await
                .context("fetch channel")?;
            println!("{} ({})", channel.slug, channel.broadcaster_user_id);
            println!("  title    : {}", channel.stream_title);
            if let Some(category) = &channel.category {
                println!("  category : {}", category.name);
            }
            match &channel.stream {
                Some(stream) if stream.is_live => {
                    println!("  live     : yes, {} viewers", stream.viewer_count);
                }
                _ => println!("  live     : no"),
            }
        }
        ("chat", words) if !words.is_empty() => {
            let content = words.join(" ");
            let message = match client.config().auth_mode() {
                AuthMode::ClientCredentials => ChatMessage::bot(content),
                AuthMode::AuthorizationCode => {
                    let me = client
                        .list_channels(&ChannelFilter::Authenticated)
                        .await
                        .context("look up own channel")?;
                    let Some(me) = me.first() else {
                        bail!("authenticated user has no channel");
                    };
                    ChatMessage::user(me.broadcaster_user_id, content)
                }
            };
            let posted = client.post_chat_message(&message).await?;
            println!("sent={} id={}", posted.is_sent, posted.message_id);
        }
        ("introspect", []) => {
            let info = client.introspect_token().await?;
            println!("active={} scope={:?}", info.active, info.scope);
        }
        _ => {
            eprintln!("{USAGE}");
            bail!("unrecognized command: {}", args.join(" "));
        }
    }

    Ok(())
}

/// Has the user open the authorization page, then reads back the code Kick redirected them with.
async fn authorize(client: &KickClient) -> eyre::Result<()> {
    let params = client.authorization_params();
    let url = client.authorization_url(&params, &["user:read", "channel:read", "chat:write"])?;
    eprintln!("open this URL and approve access:\n\n  {url}\n");
    eprintln!("then paste the `code` parameter from the redirect here:");

    let mut code = String::new();
    tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut code)
        .await
        .context("read authorization code")?;
    let code = code.trim();
    if code.is_empty() {
        bail!("no authorization code given");
    }

    let token = client.exchange_code(code, params).await?;
    tracing::info!(expires_at = %token.expires_at(), "authorized");
    Ok(())
}
