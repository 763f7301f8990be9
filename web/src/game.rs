use std::rc::Rc;

use bitflags::bitflags;
use bottlematch_core as game;
use clap::Args;
use gloo::timers::callback::Interval;
use yew::prelude::*;

use crate::host::PageHost;
use crate::scorecard::render_scorecard;
use crate::upload::FetchUploader;
use crate::utils::*;
use crate::wallet::InjectedWallet;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq)]
    struct MouseButtons: u16 {
        const LEFT    = 1;
        const RIGHT   = 1 << 1;
        const MIDDLE  = 1 << 2;
        const BACK    = 1 << 3;
        const FORWARD = 1 << 4;
    }
}

bitflags! {
    /// End-screen actions with a request still running.
    #[derive(Copy, Clone, Debug, Default, PartialEq)]
    struct InFlight: u8 {
        const SHARE = 1;
        const MINT  = 1 << 1;
    }
}

impl InFlight {
    /// Marks `action` as running, false if it already was.
    fn begin(&mut self, action: InFlight) -> bool {
        if self.intersects(action) {
            log::debug!("{:?} already in flight, ignoring", action);
            return false;
        }
        self.insert(action);
        true
    }

    fn finish(&mut self, action: InFlight) {
        self.remove(action);
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct TilePointerState {
    pos: game::Coord2,
    buttons: MouseButtons,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum TileMsg {
    Update(TilePointerState),
    Leave,
}

#[derive(Clone, Debug)]
enum EndScreen {
    Hidden,
    Rendering,
    Ready(Rc<game::ScorecardArtifact>),
    Failed(String),
}

pub(crate) enum Msg {
    TileEvent(TileMsg),
    Tick,
    Start,
    /// Tagged with the round it was started for, stale results are dropped.
    ScorecardReady(u32, Result<game::ScorecardArtifact, game::RenderError>),
    Share,
    ShareFinished(Result<game::ShareOutcome, game::ShareError>),
    Mint,
    MintFinished(Result<game::MintReceipt, game::MintError>),
}

#[derive(Properties, Clone, PartialEq)]
struct TileProps {
    x: game::Coord,
    y: game::Coord,
    tile: game::Tile,
    #[prop_or_default]
    pressed: bool,
    callback: Callback<TileMsg>,
}

#[function_component(TileView)]
fn tile_component(props: &TileProps) -> Html {
    let TileProps {
        x,
        y,
        tile,
        pressed,
        callback,
    } = props.clone();

    let mut class = classes!("bottle", tile.color.name());
    if !tile.visible {
        class.push("gone");
    }
    if pressed {
        class.push("pressed");
    }
    let style = format!("background-color: {}", tile.color.name());

    let onmousedown = {
        let callback = callback.clone();
        Callback::from(move |e: MouseEvent| {
            let buttons = MouseButtons::from_bits_truncate(e.buttons());
            callback.emit(TileMsg::Update(TilePointerState {
                pos: (x, y),
                buttons,
            }));
            log::trace!("({}, {}) mouse down ({:?})", x, y, buttons);
        })
    };

    let onmouseup = {
        let callback = callback.clone();
        Callback::from(move |e: MouseEvent| {
            let buttons = MouseButtons::from_bits_truncate(e.buttons());
            callback.emit(TileMsg::Update(TilePointerState {
                pos: (x, y),
                buttons,
            }));
            log::trace!("({}, {}) mouse up ({:?})", x, y, buttons);
        })
    };

    let onmouseleave = Callback::from(move |_: MouseEvent| {
        callback.emit(TileMsg::Leave);
        log::trace!("({}, {}) mouse leave", x, y);
    });

    html! {
        <td {class} {style} {onmousedown} {onmouseup} {onmouseleave}/>
    }
}

#[derive(Args, Properties, Debug, Clone, PartialEq)]
pub(crate) struct GameProps {
    /// Force a seed instead of random
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Force the host integration (embedded or standalone) instead of detecting it
    #[arg(long)]
    pub host: Option<game::HostEnvironment>,

    /// Name of the host SDK object on window
    #[arg(long, default_value = "sdk")]
    pub sdk_global: String,

    /// Chain to mint on, hex or decimal id
    #[arg(long, default_value = "0x2105", value_parser = parse_chain_id)]
    pub chain_id: u64,

    /// Display name of the mint chain, used when the wallet has to add it
    #[arg(long, default_value = "Base Mainnet")]
    pub chain_name: String,

    /// Scorecard contract address
    #[arg(long, default_value = game::DEFAULT_CONTRACT_ADDRESS)]
    pub contract: String,

    /// Contract method taking (string imageUrl, uint256 score)
    #[arg(long, default_value = game::DEFAULT_MINT_METHOD)]
    pub mint_method: String,

    /// Pinning endpoint for scorecard uploads
    #[arg(long, default_value = game::DEFAULT_PIN_ENDPOINT)]
    pub pin_endpoint: String,

    /// Public gateway serving pinned files
    #[arg(long, default_value = game::DEFAULT_GATEWAY)]
    pub gateway: String,

    /// Bearer token for the pinning endpoint, uploads are skipped without it
    #[arg(long)]
    pub pin_token: Option<String>,

    /// Channel to post in when sharing through the host
    #[arg(long)]
    pub channel: Option<String>,
}

fn parse_chain_id(value: &str) -> Result<u64, std::num::ParseIntError> {
    match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    }
}

impl GameProps {
    fn host(&self) -> game::HostEnvironment {
        self.host.unwrap_or_default()
    }

    fn pinning_config(&self) -> game::PinningConfig {
        game::PinningConfig {
            endpoint: self.pin_endpoint.clone(),
            gateway: self.gateway.clone(),
            token: self.pin_token.clone(),
        }
    }

    fn chain_config(&self) -> game::ChainConfig {
        game::ChainConfig {
            chain_id: self.chain_id,
            chain_name: self.chain_name.clone(),
            ..Default::default()
        }
    }

    fn contract_config(&self) -> game::ContractConfig {
        game::ContractConfig {
            address: self.contract.clone(),
            method: self.mint_method.clone(),
        }
    }
}

pub(crate) struct GameView {
    session: game::PlaySession<game::RandomGenerator>,
    round: u32,
    end_screen: EndScreen,
    current_tile_state: Option<TilePointerState>,
    in_flight: InFlight,
    timer_interval: Option<Interval>,
}

impl GameView {
    fn create_timer(ctx: &Context<Self>) -> Interval {
        let link = ctx.link().clone();
        Interval::new(1_000, move || link.send_message(Msg::Tick))
    }

    fn tap_tile(&mut self, pos: game::Coord2) {
        match self.session.tap(pos) {
            Ok(outcome) => log::debug!("tap {:?}: {:?}", pos, outcome),
            Err(err) => log::trace!("tap {:?} ignored: {}", pos, err),
        }
    }

    fn finish_session(&mut self, ctx: &Context<Self>) {
        self.timer_interval = None;
        self.end_screen = EndScreen::Rendering;

        let round = self.round;
        let score = self.session.score();
        let publisher = game::ArtifactPublisher::new(FetchUploader, ctx.props().pinning_config());
        ctx.link().send_future(async move {
            let artifact = match render_scorecard(score).await {
                Ok(image) => Ok(publisher.publish_or_fallback(score, image).await),
                Err(err) => Err(err),
            };
            Msg::ScorecardReady(round, artifact)
        });
    }

    fn artifact(&self) -> Option<Rc<game::ScorecardArtifact>> {
        match &self.end_screen {
            EndScreen::Ready(artifact) => Some(artifact.clone()),
            _ => None,
        }
    }

    fn message(&self) -> String {
        match (self.session.state(), self.session.target()) {
            (game::SessionState::Playing, Some(target)) => {
                format!("🎯 Tap all {} bottles!", target.shout())
            }
            (game::SessionState::Ended, _) => "⏰ Game Over!".to_string(),
            _ => String::new(),
        }
    }

    fn view_end_screen(&self, ctx: &Context<Self>) -> Html {
        match &self.end_screen {
            EndScreen::Hidden => html! {},
            EndScreen::Rendering => html! {
                <div class="end-screen"><p aria-busy="true">{"Preparing your scorecard…"}</p></div>
            },
            EndScreen::Failed(reason) => html! {
                <div class="end-screen"><p class="error">{format!("Could not create scorecard: {}", reason)}</p></div>
            },
            EndScreen::Ready(artifact) => {
                let props = ctx.props();
                let share_label = match props.host() {
                    game::HostEnvironment::StandaloneWallet => "📤 Share Score to Farcaster",
                    game::HostEnvironment::EmbeddedHost => "📤 Cast your score",
                };
                let mint_label = format!("💎 Mint Scorecard on {} (Fees Apply)", props.chain_name);
                html! {
                    <div class="end-screen">
                        <img class="score-img" src={artifact.image.data_url.clone()} alt="scorecard"/>
                        <div class="btn-group">
                            <button class="share-btn"
                                disabled={self.in_flight.contains(InFlight::SHARE)}
                                onclick={ctx.link().callback(|_| Msg::Share)}>{share_label}</button>
                            <button class="mint-btn"
                                disabled={self.in_flight.contains(InFlight::MINT)}
                                aria-busy={self.in_flight.contains(InFlight::MINT).then_some("true")}
                                onclick={ctx.link().callback(|_| Msg::Mint)}>{mint_label}</button>
                        </div>
                    </div>
                }
            }
        }
    }
}

impl Component for GameView {
    type Message = Msg;
    type Properties = GameProps;

    fn create(ctx: &Context<Self>) -> Self {
        let seed = ctx.props().seed.unwrap_or_else(js_random_seed);
        log::debug!("seed: {}", seed);
        Self {
            session: game::PlaySession::new(game::RandomGenerator::new(seed)),
            round: 0,
            end_screen: EndScreen::Hidden,
            current_tile_state: None,
            in_flight: InFlight::empty(),
            timer_interval: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        use Msg::*;
        use TileMsg::*;

        match msg {
            TileEvent(Leave) => self.current_tile_state.take().is_some(),
            TileEvent(Update(tile_state)) => {
                if tile_state.buttons.is_empty() {
                    // buttons released, only a lone left press on the same tile counts as a tap
                    match self.current_tile_state.take() {
                        None => false,
                        Some(TilePointerState { pos, buttons })
                            if buttons == MouseButtons::LEFT && pos == tile_state.pos =>
                        {
                            // the pressed highlight goes away, so this re-renders even on a miss
                            self.tap_tile(pos);
                            true
                        }
                        Some(_) => true,
                    }
                } else {
                    self.current_tile_state.replace(tile_state) != Some(tile_state)
                }
            }
            Tick => match self.session.tick() {
                game::TickOutcome::NoChange => false,
                game::TickOutcome::Ticked => true,
                game::TickOutcome::Expired => {
                    self.finish_session(ctx);
                    true
                }
            },
            Start => {
                self.round = self.round.wrapping_add(1);
                self.session.start();
                self.end_screen = EndScreen::Hidden;
                self.current_tile_state = None;
                self.timer_interval = Some(GameView::create_timer(ctx));
                true
            }
            ScorecardReady(round, _) if round != self.round => {
                log::debug!("dropping scorecard of round {}", round);
                false
            }
            ScorecardReady(_, Ok(artifact)) => {
                self.end_screen = EndScreen::Ready(Rc::new(artifact));
                true
            }
            ScorecardReady(_, Err(err)) => {
                log::error!("scorecard rendering failed: {}", err);
                self.end_screen = EndScreen::Failed(err.to_string());
                true
            }
            Share => {
                let Some(artifact) = self.artifact() else {
                    return false;
                };
                if !self.in_flight.begin(InFlight::SHARE) {
                    return false;
                }

                let props = ctx.props();
                let host = PageHost::new(props.host(), props.sdk_global.clone());
                let channel = props.channel.clone();
                ctx.link().send_future(async move {
                    let text = game::share_text(artifact.score);
                    ShareFinished(game::share(&host, text, artifact.share_url(), channel).await)
                });
                true
            }
            ShareFinished(result) => {
                self.in_flight.finish(InFlight::SHARE);
                match result {
                    Ok(outcome) => log::info!("shared: {:?}", outcome),
                    Err(err) => {
                        log::error!("share failed: {}", err);
                        notify(&err.to_string());
                    }
                }
                true
            }
            Mint => {
                let Some(artifact) = self.artifact() else {
                    return false;
                };
                if !self.in_flight.begin(InFlight::MINT) {
                    return false;
                }

                let props = ctx.props();
                let (host, sdk_global) = (props.host(), props.sdk_global.clone());
                let (chain, contract) = (props.chain_config(), props.contract_config());
                ctx.link().send_future(async move {
                    let wallet = InjectedWallet::for_host(host, &sdk_global).await;
                    let minter = game::Minter::new(wallet, chain, contract);
                    MintFinished(minter.mint(artifact.share_url(), artifact.score).await)
                });
                true
            }
            MintFinished(result) => {
                self.in_flight.finish(InFlight::MINT);
                match result {
                    Ok(receipt) => {
                        log::info!("minted in transaction {}", receipt.tx_hash);
                        notify(&format!(
                            "✅ NFT minted successfully on {}!",
                            ctx.props().chain_name
                        ));
                    }
                    Err(err) => {
                        log::error!("mint failed: {:?}", err);
                        notify(&err.to_string());
                    }
                }
                true
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let state = self.session.state();
        let (cols, rows) = self.session.size();
        let time_left = format!("Time: {}s", self.session.time_left());
        let score = format!("Score: {}", self.session.score());
        let start_label = if state.is_ended() { "Play Again" } else { "Start" };
        let cb_start = ctx.link().callback(|e: MouseEvent| {
            e.stop_propagation();
            Msg::Start
        });

        html! {
            <div class="bottlematch" oncontextmenu={Callback::from(move |e: MouseEvent| e.prevent_default())}>
                <nav>
                    <aside id="timer">{time_left}</aside>
                    <span id="message">{self.message()}</span>
                    <aside id="score">{score}</aside>
                </nav>
                if state.is_playing() {
                    <table id="game-container" class="playable">
                        {
                            for (0..rows).map(|y| html! {
                                <tr>
                                    {
                                        for (0..cols).filter_map(|x| {
                                            let tile = self.session.tile_at((x, y))?;
                                            let pressed = self.current_tile_state
                                                .is_some_and(|state| state.pos == (x, y) && tile.visible);
                                            let callback = ctx.link().callback(Msg::TileEvent);
                                            Some(html! {
                                                <TileView {x} {y} {tile} {callback} {pressed}/>
                                            })
                                        })
                                    }
                                </tr>
                            })
                        }
                    </table>
                } else {
                    <button id="start-button" onclick={cb_start}>{start_label}</button>
                }
                {self.view_end_screen(ctx)}
            </div>
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn second_action_waits_for_the_first() {
        let mut in_flight = InFlight::empty();

        assert!(in_flight.begin(InFlight::MINT));
        assert!(!in_flight.begin(InFlight::MINT));
        assert!(in_flight.begin(InFlight::SHARE));
        assert!(!in_flight.begin(InFlight::SHARE));

        in_flight.finish(InFlight::MINT);
        assert_eq!(in_flight, InFlight::SHARE);
        assert!(in_flight.begin(InFlight::MINT));
    }

    #[wasm_bindgen_test]
    fn chain_ids_parse_as_hex_or_decimal() {
        assert_eq!(parse_chain_id("0x2105"), Ok(8453));
        assert_eq!(parse_chain_id("8453"), Ok(8453));
        assert!(parse_chain_id("base").is_err());
    }

    #[wasm_bindgen_test]
    fn hash_arguments_configure_the_game() {
        #[derive(clap::Parser)]
        struct Hash {
            #[command(flatten)]
            game: GameProps,
        }
        use clap::Parser;

        let hash = Hash::try_parse_from(
            "#--seed=7&--host=embedded&--chain-id=0x1&--pin-token=jwt".split(['#', '&']),
        )
        .unwrap();

        assert_eq!(hash.game.seed, Some(7));
        assert_eq!(hash.game.host(), game::HostEnvironment::EmbeddedHost);
        assert_eq!(hash.game.chain_config().chain_id, 1);
        assert_eq!(hash.game.pinning_config().token.as_deref(), Some("jwt"));
        assert_eq!(hash.game.contract_config(), game::ContractConfig::default());
    }
}
