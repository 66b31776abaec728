use super::*;
use crate::errors::JailError;
use super::resolve::{Request, Walk};
use tokio::runtime::Runtime;

fn backing() -> MemoryFilesystem {
    let _ = env_logger::builder().is_test(true).try_init();
    let fs = MemoryFilesystem::new();
    fs.create_dir("/sandbox").unwrap();
    fs.create_dir("/sandbox/a").unwrap();
    fs.create_dir("/sandbox/a/b").unwrap();
    fs.create_file("/sandbox/a/file", b"hello").unwrap();
    fs.create_dir("/outside").unwrap();
    fs.create_file("/outside/secret", b"shh").unwrap();
    fs
}

fn sandbox() -> JailFilesystem<MemoryFilesystem> {
    JailFilesystem::new(backing(), "/sandbox").unwrap()
}

fn resolve(jail: &JailFilesystem<MemoryFilesystem>, path: &str) -> Result<String, JailError> {
    jail.resolve(path, ResolveOptions::new())
}

fn resolve_with(
    jail: &JailFilesystem<MemoryFilesystem>,
    path: &str,
    policy: NotFoundPolicy,
) -> Result<String, JailError> {
    jail.resolve(path, ResolveOptions::new().not_found(policy))
}

#[test]
fn path_style_normalize() {
    let posix = PathStyle::Posix;
    assert_eq!(posix.normalize("/"), "/");
    assert_eq!(posix.normalize("/a/./b//c/"), "/a/b/c");
    assert_eq!(posix.normalize("/a/../../b"), "/b");
    assert_eq!(posix.normalize("a/../../b"), "../b");
    assert_eq!(posix.normalize("a/.."), ".");
    assert_eq!(posix.normalize(""), ".");

    let windows = PathStyle::Windows;
    assert_eq!(windows.normalize("C:/x/../y"), "C:\\y");
    assert_eq!(windows.normalize("C:\\"), "C:\\");
    assert!(windows.is_absolute("D:\\"));
    assert!(!windows.is_absolute("D:"));
    assert_eq!(windows.split("C:\\a/b\\c"), vec!["a", "b", "c"]);
}

#[test]
fn path_context_operations() {
    let context = PathContext::new(PathStyle::Posix, "/a/b");
    assert_eq!(context.absolute("c"), "/a/b/c");
    assert_eq!(context.absolute("../c"), "/a/c");
    assert_eq!(context.relative("/a/b/c/d"), "c/d");
    assert_eq!(context.relative("/a/x"), "../x");
    assert_eq!(context.relative("/a/b"), ".");
    assert_eq!(context.relative("/"), "../..");
    assert_eq!(context.join("/a", "b"), "/a/b");
    assert_eq!(context.join("/", "b"), "/b");
    assert_eq!(context.join("/a", "/b"), "/b");
    assert_eq!(context.parent("/a/b"), "/a");
    assert_eq!(context.parent("/a"), "/");
    assert_eq!(context.parent("/"), "/");
    assert_eq!(context.parent("a"), ".");
    assert_eq!(context.basename("/a/b"), "b");
    assert_eq!(context.basename("/"), "");
}

#[test]
fn root_must_be_canonical() {
    for root in &["/sandbox/../sandbox", "/sandbox/", "sandbox", "/sandbox/./a", "//sandbox"] {
        match JailFilesystem::new(backing(), root) {
            Err(JailError::InvalidArgument(_)) => {}
            other => panic!("root {:?} gave {:?}", root, other.map(|_| ())),
        }
    }
    assert!(JailFilesystem::new(backing(), "/").is_ok());
    assert!(JailFilesystem::new(backing(), "/sandbox/a").is_ok());
}

#[test]
fn canonical_paths_resolve_to_themselves() {
    let jail = sandbox();
    for path in &["/", "/a", "/a/b", "/a/file"] {
        assert_eq!(resolve(&jail, path).unwrap(), *path);
    }
}

#[test]
fn dot_segments_collapse() {
    let jail = sandbox();
    assert_eq!(resolve(&jail, "/a/b/.").unwrap(), "/a/b");
    assert_eq!(resolve(&jail, "/a/b/..").unwrap(), "/a");
    assert_eq!(resolve(&jail, "/a/./b/../b").unwrap(), "/a/b");
    assert_eq!(resolve(&jail, "/..").unwrap(), "/");
    assert_eq!(resolve(&jail, "/../../../a").unwrap(), "/a");
    assert_eq!(resolve(&jail, "//a///b").unwrap(), "/a/b");
}

#[test]
fn empty_path_is_not_found() {
    let jail = sandbox();
    match resolve(&jail, "") {
        Err(JailError::NotFound(_)) => {}
        other => panic!("{:?}", other),
    }
}

#[test]
fn relative_paths_use_cwd_or_from() {
    let mut jail = sandbox();
    jail.set_current_directory("/a").unwrap();
    assert_eq!(resolve(&jail, "b").unwrap(), "/a/b");
    assert_eq!(resolve(&jail, ".").unwrap(), "/a");
    assert_eq!(resolve(&jail, "../..").unwrap(), "/");
    assert_eq!(
        jail.resolve("..", ResolveOptions::new().from("/a/b"))
            .unwrap(),
        "/a"
    );
    assert_eq!(
        jail.resolve("file", ResolveOptions::new().from("/a"))
            .unwrap(),
        "/a/file"
    );
}

#[test]
fn walk_yields_probes_in_order() {
    let confinement = Confinement::new("/sandbox", PathStyle::Posix).unwrap();
    let options = ResolveOptions::new();
    let mut walk = Walk::new(&confinement, "/a/./b", "/", &options).unwrap();
    assert_eq!(walk.advance(), Request::Probe("/sandbox/a".to_string()));
    assert_eq!(
        walk.classified("/sandbox/a".to_string(), EntityType::Directory)
            .unwrap(),
        Request::Probe("/sandbox/a/b".to_string())
    );
    assert_eq!(
        walk.classified("/sandbox/a/b".to_string(), EntityType::Link)
            .unwrap(),
        Request::ReadLink("/sandbox/a/b".to_string())
    );
    assert_eq!(walk.splice("/c"), Request::Probe("/sandbox/c".to_string()));
    assert_eq!(
        walk.classified("/sandbox/c".to_string(), EntityType::File)
            .unwrap(),
        Request::Done("/c".to_string())
    );
}

#[test]
fn translate_round_trip() {
    let jail = sandbox();
    assert_eq!(jail.to_real("/a/b", false, false).unwrap(), "/sandbox/a/b");
    assert_eq!(jail.to_real("/", false, false).unwrap(), "/sandbox");
    for local in &["/", "/a", "/a/b", "/not/yet/there"] {
        let real = jail.to_real(local, false, false).unwrap();
        assert_eq!(jail.to_local(&real, false, false).unwrap(), *local);
    }
}

#[test]
fn unresolved_to_real_needs_canonical_path() {
    let jail = sandbox();
    for local in &["a/b", "/a/../b", "/a/./b", "/a/"] {
        match jail.to_real(local, false, false) {
            Err(JailError::InvalidArgument(_)) => {}
            other => panic!("{:?} gave {:?}", local, other),
        }
    }
    assert_eq!(jail.to_real("/a/../a/b", true, true).unwrap(), "/sandbox/a/b");
}

#[test]
fn to_local_outside_the_jail() {
    let jail = sandbox();
    for real in &["/outside/secret", "/", "/sandbox2", "/sandbox/../outside"] {
        match jail.to_local(real, false, false) {
            Err(JailError::JailViolation(_)) => {}
            other => panic!("{:?} gave {:?}", real, other),
        }
        assert_eq!(jail.to_local(real, false, true).unwrap(), "/");
    }
    match jail.to_local("sandbox/a", false, false) {
        Err(JailError::InvalidArgument(_)) => {}
        other => panic!("{:?}", other),
    }
}

#[test]
fn to_local_relative_to_cwd() {
    let mut jail = sandbox();
    jail.set_current_directory("/a").unwrap();
    assert_eq!(jail.to_local("/sandbox/a/b", true, false).unwrap(), "b");
    assert_eq!(jail.to_local("/sandbox/a", true, false).unwrap(), ".");
    assert_eq!(jail.to_local("/sandbox", true, false).unwrap(), "..");
    assert_eq!(jail.to_local("/elsewhere", true, true).unwrap(), "..");
}

#[test]
fn symlink_cycle_is_detected() {
    let jail = sandbox();
    let fs = jail.backing();
    fs.create_link("/sandbox/x", "/y").unwrap();
    fs.create_link("/sandbox/y", "z").unwrap();
    fs.create_link("/sandbox/z", "x").unwrap();
    fs.create_link("/sandbox/self", "/self").unwrap();

    for path in &["/x", "/y", "/z", "/self", "/a/../x/more"] {
        match resolve(&jail, path) {
            Err(JailError::SymlinkLoop(_)) => {}
            other => panic!("{:?} gave {:?}", path, other),
        }
    }
    assert_eq!(jail.entity_type("/x", true).unwrap(), EntityType::NotFound);
    assert_eq!(jail.entity_type("/x", false).unwrap(), EntityType::Link);
    assert_eq!(jail.stat("/x").unwrap(), Stat::not_found());
}

#[test]
fn long_link_chain_resolves() {
    let jail = sandbox();
    let fs = jail.backing();
    for i in 0..40 {
        fs.create_link(&format!("/sandbox/l{}", i), &format!("l{}", i + 1))
            .unwrap();
    }
    fs.create_link("/sandbox/l40", "/a/b").unwrap();
    assert_eq!(resolve(&jail, "/l0").unwrap(), "/a/b");
    assert_eq!(jail.entity_type("/l0", true).unwrap(), EntityType::Directory);
}

#[test]
fn revisiting_a_link_after_a_directory_is_not_a_loop() {
    let jail = sandbox();
    jail.backing().create_link("/sandbox/a/up", "..").unwrap();
    assert_eq!(resolve(&jail, "/a/up/a/up/a/b").unwrap(), "/a/b");
    assert_eq!(resolve(&jail, "/a/up/a/up").unwrap(), "/");
}

#[test]
fn loop_through_an_ordinary_directory() {
    let jail = sandbox();
    jail.backing().create_link("/sandbox/a/l", "../a/l").unwrap();
    jail.backing().create_link("/sandbox/a/b/deep", "../../a/b/deep/x").unwrap();
    for path in &["/a/l", "/a/l/more", "/a/b/deep"] {
        match resolve(&jail, path) {
            Err(JailError::SymlinkLoop(_)) => {}
            other => panic!("{:?} gave {:?}", path, other),
        }
    }
    assert_eq!(jail.entity_type("/a/l", true).unwrap(), EntityType::NotFound);
    assert_eq!(jail.entity_type("/a/l", false).unwrap(), EntityType::Link);

    Runtime::new().unwrap().block_on(async {
        match jail.resolve_async("/a/l", ResolveOptions::new()).await {
            Err(JailError::SymlinkLoop(_)) => {}
            other => panic!("{:?}", other),
        }
    })
}

#[test]
fn link_revisited_after_its_target_is_walked() {
    let jail = sandbox();
    jail.backing().create_link("/sandbox/a/up", "..").unwrap();
    jail.backing()
        .create_link("/sandbox/m", "a/up/a/up/a/b")
        .unwrap();
    assert_eq!(resolve(&jail, "/m").unwrap(), "/a/b");
    assert_eq!(resolve(&jail, "/m/../up/a").unwrap(), "/a");
}

#[test]
fn link_budget_ends_long_chains() {
    let jail = sandbox();
    let fs = jail.backing();
    for i in 0..300 {
        fs.create_link(&format!("/sandbox/c{}", i), &format!("c{}", i + 1))
            .unwrap();
    }
    fs.create_dir("/sandbox/c300").unwrap();
    match resolve(&jail, "/c0") {
        Err(JailError::SymlinkLoop(_)) => {}
        other => panic!("{:?}", other),
    }
    assert_eq!(resolve(&jail, "/c100").unwrap(), "/c300");
}

#[test]
fn parent_after_missing_segment_resumes_resolution() {
    let jail = sandbox();
    jail.backing()
        .create_link("/sandbox/escape", "/outside/secret")
        .unwrap();
    jail.backing().create_link("/sandbox/a/ln", "b").unwrap();

    assert_eq!(resolve(&jail, "/missing/../escape").unwrap(), "/outside/secret");
    assert_eq!(
        jail.to_real("/missing/../escape", true, true).unwrap(),
        "/sandbox/outside/secret"
    );
    assert_eq!(
        jail.entity_type("/missing/x/../../escape", true).unwrap(),
        EntityType::NotFound
    );
    assert_eq!(jail.stat("/missing/../escape").unwrap(), Stat::not_found());
    assert_eq!(resolve(&jail, "/a/missing/../ln").unwrap(), "/a/b");
    assert_eq!(
        jail.entity_type("/a/missing/x/../../ln", true).unwrap(),
        EntityType::Directory
    );
    // still below the missing segment, so nothing is probed
    assert_eq!(resolve(&jail, "/a/missing/x/../ln").unwrap(), "/a/missing/ln");

    Runtime::new().unwrap().block_on(async {
        assert_eq!(
            jail.stat_async("/missing/../escape").await.unwrap(),
            Stat::not_found()
        );
        assert_eq!(
            jail.resolve_async("/missing/../escape", ResolveOptions::new())
                .await
                .unwrap(),
            "/outside/secret"
        );
    })
}

#[test]
fn absolute_link_target_stays_inside() {
    let jail = sandbox();
    jail.backing()
        .create_link("/sandbox/a/escape", "/outside/secret")
        .unwrap();
    assert_eq!(resolve(&jail, "/a/escape").unwrap(), "/outside/secret");
    assert_eq!(
        jail.to_real("/a/escape", true, true).unwrap(),
        "/sandbox/outside/secret"
    );
    assert_eq!(jail.entity_type("/a/escape", true).unwrap(), EntityType::NotFound);
    assert_eq!(jail.stat("/a/escape").unwrap().size, -1);

    // the backing alone is not confined
    assert_eq!(
        jail.backing().entity_type("/outside/secret", true).unwrap(),
        EntityType::File
    );
}

#[test]
fn relative_link_escape_reinterpreted_locally() {
    let jail = sandbox();
    jail.backing()
        .create_link("/sandbox/a/link", "../outside")
        .unwrap();
    match resolve_with(&jail, "/a/link", NotFoundPolicy::Throw) {
        Err(JailError::NotFound(_)) => {}
        other => panic!("{:?}", other),
    }
    assert_eq!(resolve(&jail, "/a/link").unwrap(), "/outside");

    jail.backing()
        .create_link("/sandbox/a/deep", "../../../../outside/secret")
        .unwrap();
    assert_eq!(resolve(&jail, "/a/deep").unwrap(), "/outside/secret");
}

#[test]
fn relative_link_resolves_from_its_directory() {
    let jail = sandbox();
    jail.backing().create_link("/sandbox/a/ln", "b").unwrap();
    jail.backing().create_link("/sandbox/top", "a/file").unwrap();
    assert_eq!(resolve(&jail, "/a/ln").unwrap(), "/a/b");
    assert_eq!(resolve(&jail, "/top").unwrap(), "/a/file");
    assert_eq!(resolve(&jail, "/a/ln/..").unwrap(), "/a");
}

#[test]
fn tail_link_follow_option() {
    let jail = sandbox();
    jail.backing().create_link("/sandbox/a/ln", "b").unwrap();
    assert_eq!(
        jail.resolve("/a/ln", ResolveOptions::new().no_follow())
            .unwrap(),
        "/a/ln"
    );
    // only the final segment is left alone
    assert_eq!(
        jail.resolve("/a/ln/.", ResolveOptions::new().no_follow())
            .unwrap(),
        "/a/b"
    );
    jail.backing().create_link("/sandbox/via", "/a/ln").unwrap();
    assert_eq!(
        jail.resolve("/via", ResolveOptions::new().no_follow())
            .unwrap(),
        "/via"
    );
    assert_eq!(resolve(&jail, "/via").unwrap(), "/a/b");
}

#[test]
fn file_in_the_middle_of_a_path() {
    let jail = sandbox();
    for policy in &[
        NotFoundPolicy::Allow,
        NotFoundPolicy::AllowAtTail,
        NotFoundPolicy::Throw,
        NotFoundPolicy::Mkdir,
    ] {
        match resolve_with(&jail, "/a/file/x", *policy) {
            Err(JailError::NotADirectory(_)) => {}
            other => panic!("{:?} gave {:?}", policy, other),
        }
    }
    assert_eq!(jail.entity_type("/a/file/x", true).unwrap(), EntityType::NotFound);
}

#[test]
fn not_found_policies() {
    let jail = sandbox();
    assert_eq!(
        resolve_with(&jail, "/a/missing/x/../y/.", NotFoundPolicy::Allow).unwrap(),
        "/a/missing/y"
    );
    assert_eq!(
        resolve_with(&jail, "/a/missing/../../..", NotFoundPolicy::Allow).unwrap(),
        "/"
    );
    assert_eq!(
        resolve_with(&jail, "/a/missing", NotFoundPolicy::AllowAtTail).unwrap(),
        "/a/missing"
    );
    match resolve_with(&jail, "/a/missing/x", NotFoundPolicy::AllowAtTail) {
        Err(JailError::NotFound(_)) => {}
        other => panic!("{:?}", other),
    }
    match resolve_with(&jail, "/a/missing", NotFoundPolicy::Throw) {
        Err(JailError::NotFound(_)) => {}
        other => panic!("{:?}", other),
    }
    assert_eq!(jail.entity_type("/a/missing", true).unwrap(), EntityType::NotFound);
}

#[test]
fn mkdir_policy_creates_intermediate_directories() {
    let jail = sandbox();
    assert_eq!(
        resolve_with(&jail, "/a/new/deeper/leaf", NotFoundPolicy::Mkdir).unwrap(),
        "/a/new/deeper/leaf"
    );
    let fs = jail.backing();
    assert_eq!(fs.entity_type("/sandbox/a/new", false).unwrap(), EntityType::Directory);
    assert_eq!(
        fs.entity_type("/sandbox/a/new/deeper", false).unwrap(),
        EntityType::Directory
    );
    assert_eq!(
        fs.entity_type("/sandbox/a/new/deeper/leaf", false).unwrap(),
        EntityType::NotFound
    );
}

#[test]
fn not_found_policy_from_str() {
    assert_eq!("allow".parse::<NotFoundPolicy>().unwrap(), NotFoundPolicy::Allow);
    assert_eq!(
        "allow-at-tail".parse::<NotFoundPolicy>().unwrap(),
        NotFoundPolicy::AllowAtTail
    );
    assert_eq!("throw".parse::<NotFoundPolicy>().unwrap(), NotFoundPolicy::Throw);
    assert_eq!("mkdir".parse::<NotFoundPolicy>().unwrap(), NotFoundPolicy::Mkdir);
    assert!("sometimes".parse::<NotFoundPolicy>().is_err());
}

#[test]
fn current_directory_changes() {
    let mut jail = sandbox();
    assert_eq!(jail.current_directory(), "/");
    jail.set_current_directory("/a/./b").unwrap();
    assert_eq!(jail.current_directory(), "/a/b");
    jail.set_current_directory("..").unwrap();
    assert_eq!(jail.current_directory(), "/a");

    let target = PathLike::from(&jail.directory("b"));
    assert_eq!(target, PathLike::Handle("b".to_string()));
    jail.set_current_directory(target).unwrap();
    assert_eq!(jail.current_directory(), "/a/b");

    let back = String::from("/../..");
    jail.set_current_directory(&back).unwrap();
    assert_eq!(jail.current_directory(), "/");
    assert_eq!(jail.path_context().current(), "/");
}

#[test]
fn current_directory_rejects_non_directories() {
    let mut jail = sandbox();
    jail.set_current_directory("/a").unwrap();
    match jail.set_current_directory("file") {
        Err(JailError::NotADirectory(_)) => {}
        other => panic!("{:?}", other),
    }
    assert_eq!(jail.current_directory(), "/a");
    match jail.set_current_directory("/missing") {
        Err(JailError::NotFound(_)) => {}
        other => panic!("{:?}", other),
    }
    assert_eq!(jail.current_directory(), "/a");

    jail.backing().create_link("/sandbox/a/ln", "b").unwrap();
    jail.set_current_directory("ln").unwrap();
    assert_eq!(jail.current_directory(), "/a/b");
}

#[test]
fn builder_sets_current_directory() {
    let jail = JailFilesystem::builder(backing())
        .root("/sandbox")
        .current_dir("/a/b")
        .build()
        .unwrap();
    assert_eq!(jail.current_directory(), "/a/b");
    assert_eq!(jail.root(), "/sandbox");

    match JailFilesystem::builder(backing())
        .root("/sandbox")
        .current_dir("/a/file")
        .build()
    {
        Err(JailError::NotADirectory(_)) => {}
        other => panic!("{:?}", other.map(|_| ())),
    }
}

#[test]
fn query_answers_for_missing_paths() {
    let jail = sandbox();
    assert_eq!(
        jail.entity_type("/does/not/exist", true).unwrap(),
        EntityType::NotFound
    );
    assert!(resolve_with(&jail, "/does/not/exist", NotFoundPolicy::Throw).is_err());

    let stat = jail.stat("/does/not/exist").unwrap();
    assert_eq!(stat.entity_type, EntityType::NotFound);
    assert_eq!(stat.size, -1);
    assert_eq!(stat.mode, 0);
    assert_eq!(stat.modified, None);
    assert_eq!(stat.mode_string(), "---------");
}

#[test]
fn query_answers_for_existing_paths() {
    let jail = sandbox();
    let stat = jail.stat("/a/file").unwrap();
    assert_eq!(stat.entity_type, EntityType::File);
    assert_eq!(stat.size, 5);
    assert_eq!(stat.mode, 0o644);
    assert_eq!(stat.mode_string(), "rw-r--r--");
    assert!(stat.modified.is_some());

    assert_eq!(jail.entity_type("/a", true).unwrap(), EntityType::Directory);
    assert_eq!(jail.entity_type("/a/file", true).unwrap(), EntityType::File);
    assert_eq!(jail.stat("/a").unwrap().mode_string(), "rwxr-xr-x");

    jail.backing().create_link("/sandbox/a/ln", "file").unwrap();
    assert_eq!(jail.entity_type("/a/ln", false).unwrap(), EntityType::Link);
    assert_eq!(jail.entity_type("/a/ln", true).unwrap(), EntityType::File);
    assert_eq!(jail.stat("/a/ln").unwrap().size, 5);
}

#[test]
fn identical_compares_entities() {
    let jail = sandbox();
    jail.backing().create_link("/sandbox/a/ln", "b").unwrap();
    assert!(jail.identical("/a/b", "/a/../a/b").unwrap());
    assert!(jail.identical("/a/ln", "/a/ln").unwrap());
    assert!(!jail.identical("/a/ln", "/a/b").unwrap());
    assert!(!jail.identical("/a", "/a/b").unwrap());
    assert!(jail.identical("/a/b", "/a/missing").is_err());
}

#[test]
fn system_temp_directory_is_created_once() {
    let mut jail = sandbox();
    let temp = jail.system_temp_directory().unwrap();
    assert!(temp.starts_with("/.tmp_"));
    assert_eq!(jail.entity_type(&temp, false).unwrap(), EntityType::Directory);
    assert_eq!(jail.system_temp_directory().unwrap(), temp);

    let real = jail.to_real(&temp, false, false).unwrap();
    assert!(real.starts_with("/sandbox/.tmp_"));
}

#[test]
fn system_temp_prefix_is_configurable() {
    let mut jail = JailFilesystem::builder(backing())
        .root("/sandbox")
        .temp_prefix("scratch-")
        .build()
        .unwrap();
    assert!(jail.system_temp_directory().unwrap().starts_with("/scratch-"));

    match JailFilesystem::builder(backing())
        .root("/sandbox")
        .temp_prefix("../up")
        .build()
    {
        Err(JailError::InvalidArgument(_)) => {}
        other => panic!("{:?}", other.map(|_| ())),
    }
}

#[test]
fn watching_is_unsupported() {
    assert!(!sandbox().is_watch_supported());
}

#[test]
fn entity_handles() {
    let jail = sandbox();
    let dir = jail.directory("/a/c");
    assert_eq!(dir.kind(), EntityKind::Directory);
    assert!(!dir.exists().unwrap());
    dir.create().unwrap();
    assert!(dir.exists().unwrap());
    assert_eq!(dir.real_path().unwrap(), "/sandbox/a/c");

    let file = jail.file("/a/c/new");
    file.create().unwrap();
    assert!(file.exists().unwrap());
    assert_eq!(file.stat().unwrap().size, 0);

    let link = jail.link("/a/c/ln");
    assert!(link.create().is_err());
    link.create_link("/a/b").unwrap();
    assert!(link.exists().unwrap());
    assert_eq!(link.resolved_path().unwrap(), "/a/c/ln");
    assert_eq!(jail.directory("/a/c/ln").resolved_path().unwrap(), "/a/b");
    assert!(std::ptr::eq(link.file_system(), &jail));

    match jail.file("/a/nope/new").create() {
        Err(JailError::NotFound(_)) => {}
        other => panic!("{:?}", other),
    }
    assert!(jail.file("/a/file").create().is_err());
}

#[test]
fn windows_style_backing() {
    let fs = MemoryFilesystem::with_style(PathStyle::Windows);
    fs.create_dir("C:\\sandbox").unwrap();
    fs.create_dir("C:\\sandbox\\a").unwrap();
    fs.create_link("C:\\sandbox\\a\\up", "/a/../..").unwrap();
    let jail = JailFilesystem::new(fs, "C:\\sandbox").unwrap();

    assert_eq!(jail.to_real("/a", true, true).unwrap(), "C:\\sandbox\\a");
    assert_eq!(jail.to_real("/", false, false).unwrap(), "C:\\sandbox");
    assert_eq!(jail.to_local("C:\\sandbox\\a", false, false).unwrap(), "/a");
    assert_eq!(jail.to_local("C:/sandbox/a/b", false, false).unwrap(), "/a/b");
    assert!(jail.to_local("C:\\other", false, false).is_err());
    assert_eq!(jail.resolve("/a/up", ResolveOptions::new()).unwrap(), "/");
    assert_eq!(jail.entity_type("/a", true).unwrap(), EntityType::Directory);
    assert!(JailFilesystem::new(MemoryFilesystem::with_style(PathStyle::Windows), "C:/sandbox").is_err());
}

#[test]
fn errors_map_to_errno() {
    assert_eq!(JailError::NotFound("/x".into()).to_errno(), libc::ENOENT);
    assert_eq!(JailError::NotADirectory("/x".into()).to_errno(), libc::ENOTDIR);
    assert_eq!(JailError::SymlinkLoop("/x".into()).to_errno(), libc::ELOOP);
    assert_eq!(JailError::InvalidArgument("x".into()).to_errno(), libc::EINVAL);
    assert_eq!(JailError::JailViolation("/x".into()).to_errno(), libc::EXDEV);

    let err: std::io::Error = JailError::NotFound("/x".into()).into();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    assert!(JailError::SymlinkLoop("/x".into()).is_resolution_failure());
    assert!(!JailError::InvalidArgument("x".into()).is_resolution_failure());
}

#[test]
fn async_matches_sync() {
    Runtime::new().unwrap().block_on(async {
        let mut jail = sandbox();
        jail.backing().create_link("/sandbox/a/ln", "b").unwrap();
        jail.backing().create_link("/sandbox/loop", "loop").unwrap();
        jail.backing()
            .create_link("/sandbox/a/escape", "../../outside")
            .unwrap();

        for path in &["/", "/a/./b/..", "/a/ln", "/a/escape", "/a/missing/x", "../a"] {
            assert_eq!(
                jail.resolve_async(path, ResolveOptions::new()).await.unwrap(),
                resolve(&jail, path).unwrap()
            );
        }
        match jail.resolve_async("/loop", ResolveOptions::new()).await {
            Err(JailError::SymlinkLoop(_)) => {}
            other => panic!("{:?}", other),
        }
        assert_eq!(
            jail.entity_type_async("/a/ln", false).await.unwrap(),
            EntityType::Link
        );
        assert_eq!(
            jail.entity_type_async("/loop", true).await.unwrap(),
            EntityType::NotFound
        );
        assert_eq!(jail.stat_async("/a/file").await.unwrap().size, 5);
        assert_eq!(
            jail.stat_async("/nope/nope").await.unwrap(),
            Stat::not_found()
        );
        assert!(jail.identical_async("/a/b", "/a/ln/.").await.unwrap());

        assert_eq!(
            jail.resolve_async(
                "/made/by/async",
                ResolveOptions::new().not_found(NotFoundPolicy::Mkdir)
            )
            .await
            .unwrap(),
            "/made/by/async"
        );
        assert_eq!(
            jail.entity_type("/made/by", true).unwrap(),
            EntityType::Directory
        );

        let temp = jail.system_temp_directory_async().await.unwrap();
        assert_eq!(jail.system_temp_directory_async().await.unwrap(), temp);
        assert_eq!(jail.system_temp_directory().unwrap(), temp);
    })
}
