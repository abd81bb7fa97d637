use std::collections::BTreeMap;

use anyhow::anyhow;
use duotrack::{
    chrono::{Local, NaiveDate},
    panel::ItemPanel,
    schemas::{
        common::{Collection, Item},
        media::{Media, MediaKind, Status},
        place::Place,
        video::Video,
    },
    store::{fields_of, Document, DocumentStore, FileStore},
};
use duotrack_core::{
    geo::Category,
    rating::{stars, FillState},
    ActiveUser, Ratings, StarIndex, UserId,
};
use serde::Serialize;
use serde_json::{Map, Value};
use structopt::StructOpt;

use crate::{
    common::{notice, Context},
    run_impl_enum,
};

/// Tracked items in the local store.
#[derive(StructOpt)]
pub struct ItemCommand {
    /// Who is acting (Z or T)
    #[structopt(long, short, env = "DUOTRACK_USER")]
    user: UserId,

    #[structopt(subcommand)]
    action: Action,
}

#[derive(StructOpt)]
enum Action {
    AddMedia {
        title: String,
        #[structopt(long)]
        kind: MediaKind,
        #[structopt(long)]
        year: Option<u16>,
    },
    AddPlace {
        name: String,
        #[structopt(long)]
        address: Option<String>,
        /// Coordinates or an address to look up; empty means the current location
        #[structopt(long)]
        at: Option<String>,
        #[structopt(long)]
        category: Option<Category>,
    },
    AddVideo {
        title: String,
        url: String,
        #[structopt(long)]
        channel: Option<String>,
    },
    List {
        collection: Collection,
    },
    Show {
        collection: Collection,
        id: String,
    },
    /// Tap a star: half, then full, then cleared
    Rate {
        collection: Collection,
        id: String,
        #[structopt(long)]
        star: StarIndex,
    },
    Note {
        collection: Collection,
        id: String,
        text: String,
    },
    Comment {
        collection: Collection,
        id: String,
        text: String,
    },
    Status {
        id: String,
        status: Status,
    },
    /// Record a visit, today unless `--date` is given
    Visit {
        id: String,
        #[structopt(long)]
        date: Option<NaiveDate>,
        #[structopt(long)]
        note: Option<String>,
    },
    Watched {
        id: String,
        /// Mark as not watched instead
        #[structopt(long)]
        undo: bool,
    },
    Delete {
        collection: Collection,
        id: String,
    },
}

/// One line of `list`, also the answer to every write.
#[derive(Serialize)]
struct Summary {
    id: String,
    title: String,
    ratings: Ratings,
    average: Option<String>,
    stars: BTreeMap<UserId, Vec<FillState>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_edited_by: Option<UserId>,
}

impl Summary {
    fn of<T: Item>(id: &str, item: &T, last_edited_by: Option<UserId>) -> Self {
        let ratings = *item.ratings();
        Self {
            id: id.to_string(),
            title: item.title().to_string(),
            ratings,
            average: ratings.average_text(),
            stars: ratings.iter().map(|(u, r)| (u, stars(r))).collect(),
            last_edited_by,
        }
    }

    fn from_panel<T: Item>(panel: &ItemPanel<FileStore, T>) -> Self {
        Self::of(panel.id(), panel.item(), Some(panel.user().id()))
    }
}

#[derive(Serialize)]
struct Detail {
    #[serde(flatten)]
    summary: Summary,
    fields: Map<String, Value>,
}

#[derive(Serialize)]
struct ItemRef {
    collection: Collection,
    id: String,
}

macro_rules! for_collection {
    ($collection:expr, $f:ident ( $($arg:expr),* )) => {
        match $collection {
            Collection::Media => $f::<Media>($($arg),*).await?,
            Collection::Places => $f::<Place>($($arg),*).await?,
            Collection::Videos => $f::<Video>($($arg),*).await?,
        }
    };
}

fn summarize<T: Item>(document: &Document) -> anyhow::Result<Summary> {
    let item: T = document.decode()?;
    Ok(Summary::of(&document.id, &item, document.last_edited_by()))
}

async fn list<T: Item>(ctx: &Context) -> anyhow::Result<Vec<Summary>> {
    ctx.store()
        .await?
        .list(T::COLLECTION)
        .await?
        .iter()
        .map(summarize::<T>)
        .collect()
}

async fn show<T: Item>(ctx: &Context, id: &str) -> anyhow::Result<Detail> {
    let document = ctx
        .store()
        .await?
        .get(T::COLLECTION, id)
        .await?
        .ok_or_else(|| anyhow!("no such item: {}/{}", T::COLLECTION, id))?;
    Ok(Detail {
        summary: summarize::<T>(&document)?,
        fields: document.fields,
    })
}

async fn open<T: Item>(
    ctx: &Context,
    user: UserId,
    id: &str,
) -> anyhow::Result<ItemPanel<FileStore, T>> {
    Ok(ItemPanel::open(ctx.store().await?, ActiveUser(user), id).await?)
}

async fn rate<T: Item>(
    ctx: &Context,
    user: UserId,
    id: &str,
    star: StarIndex,
) -> anyhow::Result<Summary> {
    let mut panel = open::<T>(ctx, user, id).await?;
    panel.tap_star(star).await.map_err(notice)?;
    Ok(Summary::from_panel(&panel))
}

async fn note<T: Item>(
    ctx: &Context,
    user: UserId,
    id: &str,
    text: &str,
) -> anyhow::Result<Summary> {
    let mut panel = open::<T>(ctx, user, id).await?;
    panel.edit_note(text);
    panel.save_note().await.map_err(notice)?;
    Ok(Summary::from_panel(&panel))
}

async fn comment<T: Item>(
    ctx: &Context,
    user: UserId,
    id: &str,
    text: &str,
) -> anyhow::Result<Summary> {
    let mut panel = open::<T>(ctx, user, id).await?;
    panel.add_comment(text).await.map_err(notice)?;
    Ok(Summary::from_panel(&panel))
}

async fn create<T: Item>(ctx: &Context, user: UserId, item: &T) -> anyhow::Result<ItemRef> {
    let id = ctx
        .store()
        .await?
        .create(T::COLLECTION, fields_of(item)?, user)
        .await?;
    Ok(ItemRef {
        collection: T::COLLECTION,
        id,
    })
}

run_impl_enum!(ItemCommand, self, ctx, ser, {
    let user = self.user;
    match &self.action {
        Action::AddMedia { title, kind, year } => {
            let mut media = Media::new(title, *kind);
            media.year = *year;
            erased_serde::serialize(&create(ctx, user, &media).await?, ser)?;
        }
        Action::AddPlace {
            name,
            address,
            at,
            category,
        } => {
            let mut place = Place::new(name);
            place.address = address.clone();
            place.category = *category;
            if let Some(at) = at {
                let resolved = ctx.suggester()?.resolve(at).await?;
                place.coordinates = Some(resolved.coordinates);
                if place.address.is_none() {
                    place.address = resolved.candidate.and_then(|c| c.address);
                }
            }
            erased_serde::serialize(&create(ctx, user, &place).await?, ser)?;
        }
        Action::AddVideo {
            title,
            url,
            channel,
        } => {
            let mut video = Video::new(title, url);
            video.channel = channel.clone();
            erased_serde::serialize(&create(ctx, user, &video).await?, ser)?;
        }
        Action::List { collection } => {
            erased_serde::serialize(&for_collection!(collection, list(ctx)), ser)?;
        }
        Action::Show { collection, id } => {
            erased_serde::serialize(&for_collection!(collection, show(ctx, id)), ser)?;
        }
        Action::Rate {
            collection,
            id,
            star,
        } => {
            erased_serde::serialize(
                &for_collection!(collection, rate(ctx, user, id, *star)),
                ser,
            )?;
        }
        Action::Note {
            collection,
            id,
            text,
        } => {
            erased_serde::serialize(
                &for_collection!(collection, note(ctx, user, id, text)),
                ser,
            )?;
        }
        Action::Comment {
            collection,
            id,
            text,
        } => {
            erased_serde::serialize(
                &for_collection!(collection, comment(ctx, user, id, text)),
                ser,
            )?;
        }
        Action::Status { id, status } => {
            let mut panel = open::<Media>(ctx, user, id).await?;
            panel.set_status(*status).await.map_err(notice)?;
            erased_serde::serialize(&Summary::from_panel(&panel), ser)?;
        }
        Action::Visit { id, date, note } => {
            let mut panel = open::<Place>(ctx, user, id).await?;
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            panel
                .add_visit(date, note.as_deref())
                .await
                .map_err(notice)?;
            erased_serde::serialize(&panel.item().history(), ser)?;
        }
        Action::Watched { id, undo } => {
            let mut panel = open::<Video>(ctx, user, id).await?;
            panel.set_watched(!*undo).await.map_err(notice)?;
            erased_serde::serialize(&Summary::from_panel(&panel), ser)?;
        }
        Action::Delete { collection, id } => {
            ctx.store().await?.delete(*collection, id).await?;
            erased_serde::serialize(
                &ItemRef {
                    collection: *collection,
                    id: id.clone(),
                },
                ser,
            )?;
        }
    }
});

#[cfg(test)]
mod tests {
    use duotrack::config::Config;
    use serde_json::json;

    use crate::common::{test_util::run_args, Context};

    #[tokio::test]
    async fn test_rate_from_cli() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context {
            config: Config {
                data_file: Some(dir.path().join("store.json")),
                ..Config::default()
            },
        };

        let created = run_args(&ctx, &["item", "--user", "Z", "add-media", "Arrival", "--kind", "movie"])
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let rate = ["item", "--user", "Z", "rate", "media", id.as_str(), "--star", "3"];
        let first = run_args(&ctx, &rate).await.unwrap();
        assert_eq!(first["ratings"], json!({ "Z": 2.5, "T": null }));
        let second = run_args(&ctx, &rate).await.unwrap();
        assert_eq!(second["ratings"]["Z"], 3.0);
        assert_eq!(second["average"], "3.0");
        let third = run_args(&ctx, &rate).await.unwrap();
        assert_eq!(third["ratings"]["Z"], json!(null));

        let listed = run_args(&ctx, &["item", "--user", "T", "list", "media"]).await.unwrap();
        assert_eq!(listed[0]["title"], "Arrival");
        assert_eq!(listed[0]["last_edited_by"], "Z");
    }
}
