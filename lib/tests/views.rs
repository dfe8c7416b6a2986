use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use antlers::dict;
use antlers::config::{Config, ConfigStore};
use antlers::content::{Asset, Container, MemoryDisk, Storage};
use antlers::error::Result;
use antlers::value::{Format, Toml, Value};
use antlers::view::{Environment, FsLoader, MemoryLoader, View, ViewRendered};

const CONFIG: &str = r#"
    title = "Global title"
    tagline = "Notes from the field"

    [menu]
    zeta = "Zines"
    about = "About"
    maps = "Maps"

    [site]
    name = "Field Notes"

    [translations.en]
    greeting = "Hello, :name!"
    posts = "{0} No posts|{1} One post|[2,*] :count posts"

    [translations.fr]
    greeting = "Bonjour, :name !"
"#;

fn store() -> Arc<ConfigStore> {
    let config: Config = Toml::read(CONFIG).unwrap();
    Arc::new(ConfigStore::new(config))
}

fn write(root: &Path, file: &str, contents: &str) {
    let path = root.join(file);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn templates_and_layouts_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "posts/show.antlers.html", "<h1>{{ title }}</h1>");
    write(dir.path(), "layouts/default.antlers.html",
        "<title>{{ site.name }}</title><main>{{ template_content }}</main>");
    write(dir.path(), "feed.j2", "{{ title }} ({{ site.name }})");
    write(dir.path(), "robots.txt", "User-agent: {{ title }}");

    let env = Environment::new(store(), FsLoader::new(dir.path()));

    let html = View::make("posts.show").layout("layouts.default").render(&env).unwrap();
    assert_eq!(html, "<title>Field Notes</title><main><h1>Global title</h1></main>");

    // Layouts only wrap Antlers templates.
    let feed = View::make("feed").layout("layouts.default").render(&env).unwrap();
    assert_eq!(feed, "Global title (Field Notes)");

    let robots = View::make("robots.txt").layout("layouts.default").render(&env).unwrap();
    assert_eq!(robots, "User-agent: {{ title }}");
}

#[test]
fn explicit_data_wins_over_the_cascade() {
    let loader = MemoryLoader::new()
        .with("page.antlers.html", "{{ title }}|{{ tagline }}|{{ locale }}|{{ page.title }}");

    let env = Environment::new(store(), loader);
    let content = dict! { "title" => "Content title" };

    let view = View::make("page").cascade_content(content.clone());
    assert_eq!(view.render(&env).unwrap(), "Content title|Notes from the field|en|Content title");

    let view = View::make("page")
        .cascade_content(content)
        .with_value("title", "Explicit title");

    assert_eq!(view.render(&env).unwrap(), "Explicit title|Notes from the field|en|Content title");
}

#[test]
fn configured_mappings_loop_in_file_order() {
    let loader = MemoryLoader::new()
        .with("nav.antlers.html", "{{ menu }}{{ unless first }},{{ /unless }}{{ value }}{{ /menu }}");

    let env = Environment::new(store(), loader);
    assert_eq!(View::make("nav").render(&env).unwrap(), "Zines,About,Maps");
}

#[test]
fn missing_layout_or_template_is_an_error() {
    let loader = MemoryLoader::new().with("page.antlers.html", "x");
    let env = Environment::new(store(), loader);

    assert!(View::make("page").layout("missing").render(&env).is_err());
    assert!(View::make("missing").render(&env).is_err());

    let broken = MemoryLoader::new().with("page.antlers.html", "{{ if x }}open");
    let env = Environment::new(store(), broken);
    assert!(View::make("page").render(&env).is_err());
}

#[test]
fn observers_see_each_render_once() {
    let renders = Arc::new(AtomicUsize::new(0));
    let seen = renders.clone();

    let loader = MemoryLoader::new()
        .with("page.antlers.html", "{{ title }}")
        .with("layout.antlers.html", "[{{ template_content }}]");

    let env = Environment::new(store(), loader)
        .with_observer(move |event: &ViewRendered<'_>| {
            assert_eq!(event.view.template_name(), Some("page"));
            assert_eq!(event.output, "[Global title]");
            seen.fetch_add(1, Ordering::SeqCst);
        });

    View::make("page").layout("layout").render(&env).unwrap();
    assert_eq!(renders.load(Ordering::SeqCst), 1);

    View::make("page").layout("layout").render(&env).unwrap();
    assert_eq!(renders.load(Ordering::SeqCst), 2);

    assert!(View::make("missing").render(&env).is_err());
    assert_eq!(renders.load(Ordering::SeqCst), 2);
}

#[test]
fn translations_follow_the_configuration() {
    let loader = MemoryLoader::new()
        .with("hi.antlers.html", "{{ trans:greeting name=\"Ann\" }} {{ trans_choice:posts :count=\"n\" }}");

    let store = store();
    let env = Environment::new(store.clone(), loader);
    let view = View::make("hi").with_value("n", 3);
    assert_eq!(view.render(&env).unwrap(), "Hello, Ann! 3 posts");

    let mut config: Config = Toml::read(CONFIG).unwrap();
    config.site.locale = "fr".into();
    store.reload(config);
    assert_eq!(view.render(&env).unwrap(), "Bonjour, Ann ! 3 posts");
}

#[test]
fn custom_tags_and_modifiers() {
    let loader = MemoryLoader::new()
        .with("page.antlers.html", "{{ shout:it text=\"hi\" }} {{ title | exclaim }}");

    let env = Environment::new(store(), loader)
        .register_tag("shout", |tag: &antlers::antlers::TagContext<'_>| -> Result<Value> {
            let text = tag.param_str("text").unwrap_or_default();
            Ok(Value::from(format!("{}:{}", tag.method(), text.to_uppercase())))
        })
        .register_modifier("exclaim", |value: Value, _: &[Arc<str>]| -> Result<Value> {
            Ok(Value::from(format!("{}!", value.render())))
        });

    assert_eq!(View::make("page").render(&env).unwrap(), "it:HI Global title!");
}

#[test]
fn assets_as_cascade_content() {
    let disk = Arc::new(MemoryDisk::new().with_url("/assets"));
    disk.put("img/photo.jpg", b"not really a jpeg").unwrap();

    let container = Container::new("main").with_disk("assets", disk).build();
    let asset = Asset::new().with_container(&container).with_path("img/photo.jpg");
    asset.set("alt", "A photo");

    let loader = MemoryLoader::new().with("asset.antlers.html",
        "{{ id }} {{ filename }}.{{ extension }} in {{ folder }}: {{ alt }} @ {{ page.url }}");

    let env = Environment::new(store(), loader);
    let html = View::make("asset").cascade_content(asset).render(&env).unwrap();
    assert_eq!(html, "main::img/photo.jpg photo.jpg in img: A photo @ /assets/img/photo.jpg");
}

#[test]
fn parallel_renders_keep_their_order() {
    let loader = MemoryLoader::new()
        .with("item.antlers.html", "{{ n }}{{ list }}{{ if first }}<{{ /if }}{{ value }}{{ /list }}")
        .with("plain.txt", "static");

    let env = Environment::new(store(), loader);
    let views: Vec<_> = (0..32)
        .map(|n| View::make("item").with(dict! { "n" => n, "list" => vec![n, n + 1] }))
        .chain(std::iter::once(View::make("missing")))
        .chain(std::iter::once(View::make("plain")))
        .collect();

    let results = env.render_all(&views);
    assert_eq!(results.len(), 34);
    for (n, result) in results.iter().take(32).enumerate() {
        assert_eq!(result.as_ref().unwrap(), &format!("{n}<{n}{}", n + 1));
    }

    assert!(results[32].is_err());
    assert_eq!(results[33].as_ref().unwrap(), "static");
}
