use std::{process, sync::Arc};

use time::Duration as TimeDuration;
use todo_plugin::{
    application::{error::AppError, todos::TodoRoutes},
    client::{OverrideRegistry, RenderEnvironment, TodosClientConfig},
    config,
    infra::{
        error::InfraError,
        http::{self, ApiState, PagesState, RouterState},
        local_invoker::LocalInvoker,
        memory::MemoryAdapter,
        telemetry,
    },
};
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let routes = Arc::new(TodoRoutes::new(Arc::new(MemoryAdapter::new())));
    let registry = OverrideRegistry::new();

    let stale_time = TimeDuration::try_from(settings.cache.stale_time)
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;

    let pages = PagesState {
        config: client_config(&settings.plugin),
        invoker: Arc::new(LocalInvoker::new(Arc::clone(&routes))),
        overrides: registry.todos(),
        stale_time,
    };
    let state = RouterState {
        api: ApiState { todos: routes },
        pages,
        api_base_path: settings.plugin.api_base_path.clone(),
        site_base_path: settings.plugin.site_base_path.clone(),
    };

    serve_http(&settings, state).await
}

fn client_config(plugin: &config::PluginSettings) -> TodosClientConfig {
    TodosClientConfig {
        api_base_url: plugin.api_base_url.clone(),
        api_base_path: plugin.api_base_path.clone(),
        site_base_url: plugin.site_base_url.clone(),
        site_base_path: plugin.site_base_path.clone(),
        environment: RenderEnvironment::Server,
    }
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        addr = %settings.server.addr,
        api_base_path = %settings.plugin.api_base_path,
        site_base_path = %settings.plugin.site_base_path,
        "todo-plugin listening"
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => return server_outcome(joined),
        () = shutdown_signal() => {}
    }

    info!(
        timeout_secs = settings.server.graceful_shutdown.as_secs(),
        "shutdown requested, draining connections"
    );
    let _ = stop_tx.send(());

    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(joined) => server_outcome(joined),
        Err(_) => {
            warn!("graceful shutdown timed out, aborting open connections");
            server.abort();
            Ok(())
        }
    }
}

fn server_outcome(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::from(InfraError::from(err))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
