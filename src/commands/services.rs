use crate::{
    context::Context,
    framework::{
        transformer::{Choice, Optional, TransformError, Word},
        Args, Command, Group, UserError,
    },
};
use anyhow::Result;
use rand::Rng;
use serenity::all::{CreateEmbed, CreateEmbedFooter, CreateMessage, Message};
use std::time::Duration;

const XKCD_URL: &str = "https://xkcd.com";
const OSU_API_URL: &str = "https://osu.ppy.sh/api/get_user";
const ISS_API_URL: &str = "https://api.wheretheiss.at/v1/satellites/25544";
const MAPBOX_STATIC_URL: &str = "https://api.mapbox.com/styles/v1/mapbox/dark-v11/static";

async fn send_embed(ctx: &Context, msg: &Message, embed: CreateEmbed) -> Result<()> {
    msg.channel_id
        .send_message(
            &ctx.cache_http,
            CreateMessage::new().embed(embed).reference_message(msg),
        )
        .await?;
    Ok(())
}

#[derive(Debug, serde::Deserialize)]
pub struct Comic {
    pub num: u32,
    pub title: String,
    pub alt: String,
    pub img: String,
    pub year: String,
    pub month: String,
    pub day: String,
}

/// Which comic was asked for
#[derive(Debug, PartialEq, Eq)]
pub enum ComicRequest {
    Latest,
    Random,
    Number(u32),
}

impl ComicRequest {
    fn parse(token: Option<String>) -> Result<Self, TransformError> {
        match token.as_deref() {
            None => Ok(Self::Latest),
            Some(token) if token.eq_ignore_ascii_case("random") => Ok(Self::Random),
            Some(token) => token
                .parse()
                .ok()
                .filter(|&num| num > 0)
                .map(Self::Number)
                .ok_or_else(|| TransformError::Invalid {
                    expected: "comic number or `random`",
                    found: token.to_owned(),
                }),
        }
    }
}

pub fn comic_api_url(number: Option<u32>) -> String {
    match number {
        Some(num) => format!("{XKCD_URL}/{num}/info.0.json"),
        None => format!("{XKCD_URL}/info.0.json"),
    }
}

/// `None` if there is no such comic.
async fn fetch_comic(web: &reqwest::Client, number: Option<u32>) -> Result<Option<Comic>> {
    let response = web.get(comic_api_url(number)).send().await?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    Ok(Some(response.error_for_status()?.json::<Comic>().await?))
}

pub struct Xkcd;

#[serenity::async_trait]
impl Command for Xkcd {
    fn name(&self) -> &'static str {
        "xkcd"
    }

    fn group(&self) -> Group {
        Group::Services
    }

    fn usage(&self) -> &'static str {
        "[number|random]"
    }

    fn description(&self) -> &'static str {
        "show an xkcd comic, the latest by default"
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let request = ComicRequest::parse(args.parse(&Optional(Word))?)?;
        args.finish()?;

        let number = match request {
            ComicRequest::Latest => None,
            ComicRequest::Number(num) => Some(num),
            ComicRequest::Random => {
                let latest = fetch_comic(&ctx.web, None)
                    .await?
                    .ok_or_else(|| UserError::new("xkcd seems to be empty right now."))?;
                let num = rand::thread_rng().gen_range(1..=latest.num);
                Some(num)
            }
        };

        let Some(comic) = fetch_comic(&ctx.web, number).await? else {
            return Err(UserError::new("That comic does not exist.").into());
        };

        let embed = CreateEmbed::new()
            .title(format!("xkcd #{}: {}", comic.num, comic.title))
            .url(format!("{XKCD_URL}/{}/", comic.num))
            .image(&comic.img)
            .footer(CreateEmbedFooter::new(format!(
                "{} ({}-{:0>2}-{:0>2})",
                comic.alt, comic.year, comic.month, comic.day
            )));
        send_embed(ctx, msg, embed).await
    }
}

/// Every field comes back as a string and may be null for users that never played.
#[derive(Debug, Default, serde::Deserialize)]
pub struct OsuUser {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub country: Option<String>,
    pub level: Option<String>,
    pub playcount: Option<String>,
    pub pp_raw: Option<String>,
    pub pp_rank: Option<String>,
    pub pp_country_rank: Option<String>,
    pub accuracy: Option<String>,
}

const OSU_MODES: &[&str] = &["osu", "taiko", "ctb", "mania"];

fn osu_mode_index(mode: &str) -> usize {
    OSU_MODES
        .iter()
        .position(|m| m.eq_ignore_ascii_case(mode))
        .unwrap_or(0)
}

/// `value` rounded to `digits` decimals, or `-` if absent or not a number.
fn decimal(value: &Option<String>, digits: usize) -> String {
    value
        .as_deref()
        .and_then(|v| v.parse::<f64>().ok())
        .map(|v| format!("{v:.digits$}"))
        .unwrap_or_else(|| "-".to_owned())
}

fn rank(value: &Option<String>) -> String {
    match value.as_deref() {
        Some(rank) if rank != "0" => format!("#{rank}"),
        _ => "-".to_owned(),
    }
}

/// Embed fields as (name, value, inline).
pub fn osu_fields(user: &OsuUser) -> Vec<(&'static str, String, bool)> {
    vec![
        ("Rank", rank(&user.pp_rank), true),
        (
            "Country rank",
            format!(
                "{} {}",
                rank(&user.pp_country_rank),
                user.country.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_owned(),
            true,
        ),
        ("PP", decimal(&user.pp_raw, 0), true),
        ("Accuracy", format!("{}%", decimal(&user.accuracy, 2)), true),
        ("Level", decimal(&user.level, 0), true),
        (
            "Play count",
            user.playcount.clone().unwrap_or_else(|| "-".to_owned()),
            true,
        ),
    ]
}

pub struct Osu;

#[serenity::async_trait]
impl Command for Osu {
    fn name(&self) -> &'static str {
        "osu"
    }

    fn group(&self) -> Group {
        Group::Services
    }

    fn usage(&self) -> &'static str {
        "<username> [osu|taiko|ctb|mania]"
    }

    fn description(&self) -> &'static str {
        "look up an osu! player"
    }

    fn cooldown(&self) -> Option<Duration> {
        Some(Duration::from_secs(5))
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let username = args.parse(&Word)?;
        let mode = args.parse(&Optional(Choice(OSU_MODES)))?;
        args.finish()?;

        let Some(key) = ctx.cfg.read().await.services.osu_api_key.clone() else {
            return Err(UserError::new("osu! lookups are not configured.").into());
        };
        let mode = osu_mode_index(mode.unwrap_or("osu"));
        let mode_param = mode.to_string();

        let users = ctx
            .web
            .get(OSU_API_URL)
            .query(&[
                ("k", key.as_str()),
                ("u", username.as_str()),
                ("type", "string"),
                ("m", mode_param.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<OsuUser>>()
            .await?;
        let Some(user) = users.into_iter().next() else {
            return Err(UserError::new(format!("No osu! player called `{username}`.")).into());
        };

        let name = user.username.clone().unwrap_or(username);
        let mut embed = CreateEmbed::new()
            .title(format!("{} ({})", name, OSU_MODES[mode]))
            .fields(osu_fields(&user));
        if let Some(id) = &user.user_id {
            embed = embed
                .url(format!("https://osu.ppy.sh/users/{id}"))
                .thumbnail(format!("https://a.ppy.sh/{id}"));
        }
        send_embed(ctx, msg, embed).await
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct IssPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Kilometers
    pub altitude: f64,
    /// Kilometers per hour
    pub velocity: f64,
    pub visibility: String,
}

pub fn mapbox_url(latitude: f64, longitude: f64, token: &str) -> String {
    format!(
        "{MAPBOX_STATIC_URL}/pin-l+f74e4e({longitude:.4},{latitude:.4})/{longitude:.4},{latitude:.4},2/640x360?access_token={token}"
    )
}

pub struct Iss;

#[serenity::async_trait]
impl Command for Iss {
    fn name(&self) -> &'static str {
        "iss"
    }

    fn group(&self) -> Group {
        Group::Services
    }

    fn description(&self) -> &'static str {
        "where is the International Space Station right now?"
    }

    fn cooldown(&self) -> Option<Duration> {
        Some(Duration::from_secs(5))
    }

    async fn run(&self, ctx: &Context, msg: &Message, args: Args) -> Result<()> {
        args.finish()?;

        let position = ctx
            .web
            .get(ISS_API_URL)
            .send()
            .await?
            .error_for_status()?
            .json::<IssPosition>()
            .await?;

        let mut embed = CreateEmbed::new()
            .title("International Space Station")
            .field("Latitude", format!("{:.4}", position.latitude), true)
            .field("Longitude", format!("{:.4}", position.longitude), true)
            .field("Altitude", format!("{:.0} km", position.altitude), true)
            .field("Velocity", format!("{:.0} km/h", position.velocity), true)
            .field("Visibility", &position.visibility, true);

        let token = ctx.cfg.read().await.services.mapbox_token.clone();
        if let Some(token) = token {
            embed = embed.image(mapbox_url(position.latitude, position.longitude, &token));
        }
        send_embed(ctx, msg, embed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn comic_requests() {
        assert_eq!(ComicRequest::parse(None), Ok(ComicRequest::Latest));
        assert_eq!(
            ComicRequest::parse(Some("RANDOM".to_owned())),
            Ok(ComicRequest::Random)
        );
        assert_eq!(
            ComicRequest::parse(Some("327".to_owned())),
            Ok(ComicRequest::Number(327))
        );
        assert!(ComicRequest::parse(Some("0".to_owned())).is_err());
        assert!(ComicRequest::parse(Some("latest".to_owned())).is_err());

        assert_eq!(comic_api_url(None), "https://xkcd.com/info.0.json");
        assert_eq!(comic_api_url(Some(42)), "https://xkcd.com/42/info.0.json");
    }

    #[test]
    fn comic_json() {
        let comic: Comic = serde_json::from_str(
            r#"{"month": "10", "num": 327, "link": "", "year": "2007", "news": "",
                "safe_title": "Exploits of a Mom", "transcript": "",
                "alt": "Her daughter is named Help I'm trapped in a driver's license factory.",
                "img": "https://imgs.xkcd.com/comics/exploits_of_a_mom.png",
                "title": "Exploits of a Mom", "day": "10"}"#,
        )
        .unwrap();
        assert_eq!(comic.num, 327);
        assert_eq!(comic.title, "Exploits of a Mom");
        assert_eq!(comic.day, "10");
    }

    #[test]
    fn osu_user_fields() {
        let users: Vec<OsuUser> = serde_json::from_str(
            r#"[{"user_id": "124493", "username": "Cookiezi", "country": "KR",
                 "level": "101.53", "playcount": "29463", "pp_raw": "12104.3",
                 "pp_rank": "3", "pp_country_rank": "1", "accuracy": "98.8812255859375",
                 "count300": "1", "events": []}]"#,
        )
        .unwrap();
        let fields = osu_fields(&users[0]);
        assert_eq!(fields[0], ("Rank", "#3".to_owned(), true));
        assert_eq!(fields[1], ("Country rank", "#1 KR".to_owned(), true));
        assert_eq!(fields[2], ("PP", "12104".to_owned(), true));
        assert_eq!(fields[3], ("Accuracy", "98.88%".to_owned(), true));
        assert_eq!(fields[4], ("Level", "102".to_owned(), true));
        assert_eq!(fields[5], ("Play count", "29463".to_owned(), true));
    }

    #[test]
    fn inactive_osu_user() {
        let users: Vec<OsuUser> = serde_json::from_str(
            r#"[{"user_id": "2", "username": "peppy", "pp_rank": "0", "pp_raw": null,
                 "accuracy": null, "level": null, "playcount": null,
                 "pp_country_rank": null, "country": "AU"}]"#,
        )
        .unwrap();
        let fields = osu_fields(&users[0]);
        assert_eq!(fields[0].1, "-");
        assert_eq!(fields[1].1, "- AU");
        assert_eq!(fields[3].1, "-%");
    }

    #[test]
    fn osu_modes() {
        assert_eq!(osu_mode_index("osu"), 0);
        assert_eq!(osu_mode_index("Mania"), 3);
        assert_eq!(osu_mode_index("unknown"), 0);
    }

    #[test]
    fn iss_position_and_map() {
        let position: IssPosition = serde_json::from_str(
            r#"{"name": "iss", "id": 25544, "latitude": 50.11496269845,
                "longitude": 118.07900427317, "altitude": 408.05526028199,
                "velocity": 27635.971970874, "visibility": "daylight",
                "footprint": 4446.1877699772, "timestamp": 1364069476,
                "daynum": 2456375.3411574, "solar_lat": 1.3327003598631,
                "solar_lon": 238.78610691196, "units": "kilometers"}"#,
        )
        .unwrap();
        assert_eq!(position.visibility, "daylight");
        assert_eq!(
            mapbox_url(position.latitude, position.longitude, "tok"),
            "https://api.mapbox.com/styles/v1/mapbox/dark-v11/static/\
             pin-l+f74e4e(118.0790,50.1150)/118.0790,50.1150,2/640x360?access_token=tok"
        );
    }
}
