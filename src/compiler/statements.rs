//! `STATEMENT`: one line of a script body, or a whole block.
//!
//! Most statements are a keyword pattern followed by a native call and are
//! listed in [`STATEMENT_RULES`]. Assignments, script calls, `wait`,
//! snapshots and labels carry state the patterns cannot express and are
//! handled by hand.

use crate::bytecode::native::NativeFunction;
use crate::bytecode::op::Opcode;
use crate::compiler::grammar::Alt;
use crate::compiler::parse_error::ParseError;
use crate::compiler::{Compiler, ParserContext};
use crate::frontend::symbol::Symbol;
use crate::frontend::syntax::STATEMENT;
use crate::frontend::token::TokenKind;

const STATEMENT_RULES: &[Alt] = &[
    form![pat!("remove resource CONST_EXPR EXPRESSION from OBJECT EOL"), sys!(REMOVE_RESOURCE), emit!(PopF)],
    form![pat!("add for building OBJECT to OBJECT EOL"), unsupported!()],
    form![pat!("add resource CONST_EXPR EXPRESSION to OBJECT EOL"), sys!(ADD_RESOURCE), emit!(PopF)],
    after!(
        "add OBJECT target",
        [pat!("at COORD_EXPR EOL"), sys!(ADD_SPOT_VISUAL_TARGET_POS)],
        [pat!("on OBJECT EOL"), sys!(ADD_SPOT_VISUAL_TARGET_OBJECT)],
    ),
    // move
    form![
        pat!("move computer player EXPRESSION to COORD_EXPR speed EXPRESSION [with fixed height] EOL"),
        sys!(MOVE_COMPUTER_PLAYER_POSITION)
    ],
    form![pat!("move game time EXPRESSION time EXPRESSION EOL"), sys!(MOVE_GAME_TIME)],
    form![pat!("move music from OBJECT to OBJECT EOL"), unsupported!()],
    form![pat!("move camera position to COORD_EXPR time EXPRESSION EOL"), sys!(MOVE_CAMERA_POSITION)],
    form![pat!("move camera position follow OBJECT EOL"), sys!(POSITION_FOLLOW)],
    form![
        pat!("move camera position COORD_EXPR focus COORD_EXPR lens EXPRESSION time EXPRESSION EOL"),
        unsupported!()
    ],
    form![pat!("move camera focus to COORD_EXPR time EXPRESSION EOL"), sys!(MOVE_CAMERA_FOCUS)],
    form![pat!("move camera focus follow OBJECT EOL"), sys!(FOCUS_FOLLOW)],
    form![
        pat!("move camera to face OBJECT distance EXPRESSION time EXPRESSION EOL"),
        sys!(MOVE_CAMERA_TO_FACE_OBJECT)
    ],
    form![pat!("move OBJECT position to COORD_EXPR [radius EXPRESSION] EOL"), sys!(MOVE_GAME_THING)],
    // set
    form![pat!("set player_creature to OBJECT EOL"), sys!(CREATURE_SET_PLAYER)],
    form![
        pat!("set player EXPRESSION ally with player EXPRESSION percentage EXPRESSION EOL"),
        sys!(SET_PLAYER_ALLY)
    ],
    after!(
        "set computer player EXPRESSION",
        [pat!("position to COORD_EXPR [with fixed height] EOL"), sys!(SET_COMPUTER_PLAYER_POSITION)],
        [pat!("personality STRING EXPRESSION EOL"), sys!(SET_COMPUTER_PLAYER_PERSONALITY)],
        [pat!("suppression STRING EXPRESSION EOL"), unsupported!()],
        [pat!("speed EXPRESSION EOL"), sys!(SET_COMPUTER_PLAYER_SPEED)],
        [pat!("attitude to player EXPRESSION to EXPRESSION EOL"), sys!(SET_COMPUTER_PLAYER_ATTITUDE)],
    ),
    form![
        pat!("set game time properties duration EXPRESSION percentage night EXPRESSION percentage dawn dusk EXPRESSION EOL"),
        unsupported!()
    ],
    form![pat!("set game time EXPRESSION EOL"), sys!(SET_GAME_TIME)],
    form![pat!("set game speed to EXPRESSION EOL"), sys!(SET_GAMESPEED)],
    form![pat!("set interaction CONST_EXPR EOL"), sys!(SET_INTERFACE_INTERACTION)],
    form![
        pat!("set fade red EXPRESSION green EXPRESSION blue EXPRESSION time EXPRESSION EOL"),
        sys!(SET_FADE)
    ],
    form![pat!("set fade in time EXPRESSION EOL"), sys!(SET_FADE_IN)],
    form![pat!("set bookmark EXPRESSION to COORD_EXPR EOL"), unsupported!()],
    form![
        pat!("set draw text colour red EXPRESSION green EXPRESSION blue EXPRESSION EOL"),
        sys!(SET_DRAW_TEXT_COLOUR)
    ],
    form![
        pat!("set clipping window across EXPRESSION down EXPRESSION width EXPRESSION height EXPRESSION time EXPRESSION EOL"),
        sys!(SET_CLIPPING_WINDOW)
    ],
    form![pat!("set camera zones to STRING EOL"), sys!(SET_CAMERA_ZONE)],
    form![pat!("set camera lens EXPRESSION [time EXPRESSION] EOL"), sys!(MOVE_CAMERA_LENS)],
    form![pat!("set camera position to COORD_EXPR EOL"), sys!(SET_CAMERA_POSITION)],
    form![
        pat!("set camera position follow computer player EXPRESSION EOL"),
        sys!(SET_POSITION_FOLLOW_COMPUTER_PLAYER)
    ],
    form![pat!("set camera position follow OBJECT EOL"), sys!(SET_POSITION_FOLLOW)],
    form![pat!("set camera position COORD_EXPR focus COORD_EXPR lens EXPRESSION EOL"), unsupported!()],
    form![pat!("set camera focus to COORD_EXPR EOL"), sys!(SET_CAMERA_FOCUS)],
    form![
        pat!("set camera focus follow computer player EXPRESSION EOL"),
        sys!(SET_FOCUS_FOLLOW_COMPUTER_PLAYER)
    ],
    form![pat!("set camera focus follow OBJECT EOL"), sys!(SET_FOCUS_FOLLOW)],
    form![pat!("set camera to face OBJECT distance EXPRESSION EOL"), unsupported!()],
    form![pat!("set camera follow OBJECT distance EXPRESSION EOL"), sys!(SET_FOCUS_AND_POSITION_FOLLOW)],
    form![
        pat!("set camera properties distance EXPRESSION speed EXPRESSION angle EXPRESSION enable|disable behind EOL"),
        sys!(CAMERA_PROPERTIES)
    ],
    form![pat!("set dual camera to OBJECT OBJECT EOL"), sys!(UPDATE_DUAL_CAMERA)],
    after!(
        "set OBJECT",
        [pat!("position to COORD_EXPR EOL"), sys!(SET_POSITION)],
        [pat!("disciple CONST_EXPR [with sound] EOL"), sys!(SET_DISCIPLE)],
        [pat!("focus to COORD_EXPR EOL"), sys!(SET_FOCUS)],
        [pat!("focus on OBJECT EOL"), sys!(SET_FOCUS_ON_OBJECT)],
        [pat!("anim CONST_EXPR EOL"), sys!(OVERRIDE_STATE_ANIMATION)],
        [
            pat!("properties inner EXPRESSION outer EXPRESSION [calm EXPRESSION] EOL"),
            sys!(CHANGE_INNER_OUTER_PROPERTIES)
        ],
        [
            pat!("properties town OBJECT flock position COORD_EXPR distance EXPRESSION radius EXPRESSION flock OBJECT EOL"),
            sys!(VORTEX_PARAMETERS)
        ],
        [
            pat!("properties degrees EXPRESSION rainfall EXPRESSION snowfall EXPRESSION overcast EXPRESSION fallspeed EXPRESSION EOL"),
            sys!(CHANGE_WEATHER_PROPERTIES)
        ],
        [pat!("properties time EXPRESSION fade EXPRESSION EOL"), sys!(CHANGE_TIME_FADE_PROPERTIES)],
        [
            pat!("properties clouds EXPRESSION shade EXPRESSION height EXPRESSION EOL"),
            sys!(CHANGE_CLOUD_PROPERTIES)
        ],
        [
            pat!("properties sheetmin EXPRESSION sheetmax EXPRESSION forkmin EXPRESSION forkmax EXPRESSION EOL"),
            sys!(CHANGE_LIGHTNING_PROPERTIES)
        ],
        [
            pat!("text property text CONST_EXPR category CONST_EXPR EOL"),
            sys!(HIGHLIGHT_PROPERTIES)
        ],
        [pat!("velocity heading COORD_EXPR speed EXPRESSION EOL"), sys!(SET_HEADING_AND_SPEED)],
        [pat!("target COORD_EXPR time EXPRESSION EOL"), sys!(SET_TARGET)],
        [pat!("time to EXPRESSION second|seconds EOL"), sys!(SET_TIMER_TIME)],
        [pat!("radius EXPRESSION EOL"), sys!(SET_MAGIC_RADIUS)],
        [pat!("mana EXPRESSION EOL"), sys!(GAME_SET_MANA)],
        [pat!("temperature EXPRESSION EOL"), sys!(SET_TEMPERATURE)],
        [
            pat!("forward|reverse walk path CHALLENGE_CONST from EXPRESSION to EXPRESSION EOL"),
            sys!(WALK_PATH)
        ],
        [pat!("desire maximum CONST_EXPR to EXPRESSION EOL"), sys!(CREATURE_SET_DESIRE_MAXIMUM)],
        [pat!("desire boost CONST_EXPR EXPRESSION EOL"), sys!(SET_TOWN_DESIRE_BOOST)],
        [pat!("desire CONST_EXPR to EXPRESSION EOL"), sys!(CREATURE_SET_DESIRE_VALUE)],
        [pat!("desire CONST_EXPR CONST_EXPR EOL"), sys!(CREATURE_SET_DESIRE_ACTIVATED3)],
        [pat!("only desire CONST_EXPR EOL"), emit!(PushF(86400.0)), sys!(SET_CREATURE_ONLY_DESIRE)],
        [pat!("disable only desire EOL"), sys!(SET_CREATURE_ONLY_DESIRE_OFF)],
        [pat!("magic properties CONST_EXPR [time EXPRESSION] EOL"), sys!(SET_MAGIC_PROPERTIES)],
        [pat!("all desires CONST_EXPR EOL"), unsupported!()],
        [pat!("priority EXPRESSION EOL"), sys!(CREATURE_SET_AGENDA_PRIORITY)],
        [pat!("home position COORD_EXPR EOL"), sys!(SET_CREATURE_HOME)],
        [
            pat!("creed properties hand CONST_EXPR scale EXPRESSION power EXPRESSION time EXPRESSION EOL"),
            sys!(SET_CREATURE_CREED_PROPERTIES)
        ],
        [pat!("name CONST_EXPR EOL"), sys!(SET_CREATURE_NAME)],
        [
            pat!("fade start scale EXPRESSION end scale EXPRESSION start transparency EXPRESSION end transparency EXPRESSION time EXPRESSION EOL"),
            sys!(SET_MIST_FADE)
        ],
        [pat!("fade in time EXPRESSION EOL"), sys!(SET_OBJECT_FADE_IN)],
        [pat!("belief scale EXPRESSION EOL"), unsupported!()],
        [pat!("player EXPRESSION relative belief EXPRESSION EOL"), sys!(OBJECT_RELATIVE_BELIEF)],
        [pat!("player EXPRESSION belief EXPRESSION EOL"), sys!(SET_PLAYER_BELIEF)],
        [
            pat!("building properties CONST_EXPR size EXPRESSION [destroys when placed] EOL"),
            sys!(SET_SCAFFOLD_PROPERTIES)
        ],
        [pat!("carrying CONST_EXPR EOL"), sys!(SET_OBJECT_CARRYING)],
        [pat!("music position to COORD_EXPR EOL"), unsupported!()],
        [pat!("CONST_EXPR development EOL"), sys!(SET_CREATURE_DEV_STAGE)],
    ),
    form![pat!("set EXPRESSION land balance EXPRESSION EOL"), unsupported!()],
    // delete, release
    form![pat!("delete all weather at COORD_EXPR radius EXPRESSION EOL"), sys!(KILL_STORMS_IN_AREA)],
    form![pat!("release computer player EXPRESSION EOL"), sys!(RELEASE_COMPUTER_PLAYER)],
    after!(
        "release OBJECT",
        [pat!("focus EOL"), sys!(RELEASE_OBJECT_FOCUS)],
        [pat!("EOL"), sys!(RELEASE_FROM_SCRIPT)],
    ),
    // enable|disable
    after!(
        "enable|disable",
        [pat!("leash on OBJECT EOL"), sys!(SET_LEASH_WORKS)],
        [pat!("leash draw EOL"), sys!(SET_DRAW_LEASH)],
        [pat!("player EXPRESSION wind resistance EOL"), unsupported!()],
        [pat!("player EXPRESSION virtual influence EOL"), sys!(SET_VIRTUAL_INFLUENCE)],
        [pat!("fight exit EOL"), unsupported!()],
        [pat!("computer player EXPRESSION EOL"), sys!(ENABLE_DISABLE_COMPUTER_PLAYER1)],
        [pat!("game time EOL"), sys!(GAME_TIME_ON_OFF)],
        [pat!("help system EOL"), unsupported!()],
        [pat!("creature sound EOL"), sys!(SET_CREATURE_SOUND)],
        [pat!("creature in temple EOL"), sys!(SET_CREATURE_IN_TEMPLE)],
        [pat!("sound effects EOL"), sys!(SET_GAME_SOUND)],
        [pat!("spell CONST_EXPR in OBJECT EOL"), sys!(SET_MAGIC_IN_OBJECT)],
        [pat!("spell CONST_EXPR for player EXPRESSION EOL"), unsupported!()],
        [pat!("angle sound EOL"), sys!(START_ANGLE_SOUND1)],
        [pat!("pitch sound EOL"), sys!(START_ANGLE_SOUND2)],
        [pat!("highlight draw EOL"), sys!(SET_DRAW_HIGHLIGHT)],
        [pat!("intro building EOL"), unsupported!()],
        [pat!("temple EOL"), sys!(SET_INTERFACE_CITADEL)],
        [pat!("climate weather EOL"), sys!(PAUSE_UNPAUSE_CLIMATE_SYSTEM)],
        [pat!("climate create storms EOL"), sys!(PAUSE_UNPAUSE_STORM_CREATION_IN_CLIMATE_SYSTEM)],
        [pat!("music on OBJECT EOL"), unsupported!()],
        [pat!("alignment music EOL"), sys!(ENABLE_DISABLE_ALIGNMENT_MUSIC)],
        [pat!("clipping distance EXPRESSION EOL"), unsupported!()],
        [pat!("camera fixed rotation at COORD_EXPR EOL"), unsupported!()],
        [pat!("jc special CONST_EXPR on OBJECT EOL"), sys!(THING_JC_SPECIAL)],
    ),
    after!(
        "enable|disable OBJECT",
        [pat!("active EOL"), sys!(SET_ACTIVE)],
        [pat!("attack own town EOL"), unsupported!()],
        [pat!("reaction EOL"), unsupported!()],
        [pat!("development script EOL"), sys!(CREATURE_IN_DEV_SCRIPT)],
        [pat!("spell reversion EOL"), unsupported!()],
        [pat!("anim time modify EOL"), sys!(SET_ANIMATION_MODIFY)],
        [pat!("friends with OBJECT EOL"), sys!(CREATURE_FORCE_FRIENDS)],
        [pat!("auto fighting EOL"), sys!(SET_CREATURE_AUTO_FIGHTING)],
        [pat!("auto scale EXPRESSION EOL"), sys!(CREATURE_AUTOSCALE)],
        [pat!("auto scale EOL"), emit!(PushF(0.0)), sys!(CREATURE_AUTOSCALE)],
        [pat!("only for scripts EOL"), unsupported!()],
        [pat!("poisoned EOL"), sys!(SET_POISONED)],
        [pat!("build worship site EOL"), sys!(SET_CAN_BUILD_WORSHIPSITE)],
        [pat!("skeleton EOL"), sys!(SET_SKELETON)],
        [pat!("indestructible EOL"), sys!(SET_INDESTRUCTABLE)],
        [pat!("hurt by fire EOL"), sys!(SET_HURT_BY_FIRE)],
        [pat!("set on fire EOL"), sys!(SET_SET_ON_FIRE)],
        [pat!("on fire EXPRESSION EOL"), sys!(SET_ON_FIRE)],
        [pat!("moveable EOL"), sys!(SET_ID_MOVEABLE)],
        [pat!("pickup EOL"), sys!(SET_ID_PICKUPABLE)],
        [pat!("high graphics|gfx detail EOL"), sys!(SET_HIGH_GRAPHICS_DETAIL)],
        [pat!("affected by wind EOL"), sys!(SET_AFFECTED_BY_WIND)],
    ),
    after!("enable|disable CONST_EXPR", [pat!("avi sequence EOL"), sys!(SET_AVI_SEQUENCE)]),
    // open, close, teach, force
    form![pat!("close dialogue EOL"), sys!(GAME_CLOSE_DIALOGUE)],
    form![pat!("open|close OBJECT EOL"), sys!(SET_OPEN_CLOSE)],
    after!(
        "teach OBJECT",
        [pat!("all excluding CONST_EXPR EOL"), unsupported!()],
        [pat!("everything EOL"), sys!(CREATURE_LEARN_EVERYTHING)],
        [pat!("CONST_EXPR CONST_EXPR CONST_EXPR EOL"), sys!(CREATURE_SET_KNOWS_ACTION)],
    ),
    form![pat!("force action OBJECT finish EOL"), unsupported!()],
    form![
        pat!("force computer player EXPRESSION action STRING OBJECT OBJECT EOL"),
        sys!(FORCE_COMPUTER_PLAYER_ACTION)
    ],
    form![pat!("force OBJECT CONST_EXPR OBJECT [with OBJECT] EOL"), sys!(CREATURE_DO_ACTION)],
    form![pat!("initialise number of constant for OBJECT EOL"), unsupported!()],
    // clear
    form![pat!("clear dropped by OBJECT EOL"), unsupported!()],
    form![
        pat!("clear computer player EXPRESSION actions EOL"),
        sys!(GAME_CLEAR_COMPUTER_PLAYER_ACTIONS)
    ],
    form![pat!("clear clicked object EOL"), sys!(CLEAR_CLICKED_OBJECT)],
    form![pat!("clear clicked position EOL"), sys!(CLEAR_CLICKED_POSITION)],
    form![pat!("clear hit object EOL"), sys!(CLEAR_HIT_OBJECT)],
    form![pat!("clear player EXPRESSION spell charging EOL"), sys!(CLEAR_PLAYER_SPELL_CHARGING)],
    form![pat!("clear dialogue EOL"), sys!(GAME_CLEAR_DIALOGUE)],
    form![pat!("clear clipping window time EXPRESSION EOL"), sys!(CLEAR_CLIPPING_WINDOW)],
    // attach, toggle, detach
    form![pat!("attach reaction OBJECT CONST_EXPR EOL"), sys!(CREATE_REACTION)],
    form![pat!("attach music CONST_EXPR to OBJECT EOL"), sys!(ATTACH_MUSIC)],
    form![
        pat!("attach [3d] sound tag CONST_EXPR"),
        const_or!("AUDIO_SFX_BANK_TYPE_IN_GAME"),
        pat!("to OBJECT EOL"),
        sys!(ATTACH_SOUND_TAG)
    ],
    after!(
        "attach OBJECT",
        [pat!("leash to hand EOL"), unsupported!()],
        [pat!("leash to OBJECT EOL"), unsupported!()],
        [pat!("to game OBJECT for PLAYING_SIDE team EOL"), unsupported!()],
        [pat!("to OBJECT [as leader] EOL"), sys!(FLOCK_ATTACH), emit!(PopO)],
    ),
    form![pat!("toggle player EXPRESSION leash EOL"), sys!(TOGGLE_LEASH)],
    form![pat!("detach player from OBJECT from PLAYING_SIDE team EOL"), unsupported!()],
    form![
        pat!("detach sound tag CONST_EXPR"),
        const_or!("AUDIO_SFX_BANK_TYPE_IN_GAME"),
        pat!("from OBJECT EOL"),
        sys!(DETACH_SOUND_TAG)
    ],
    after!(
        "detach reaction OBJECT",
        [pat!("EOL"), sys!(REMOVE_REACTION)],
        [pat!("CONST_EXPR EOL"), sys!(REMOVE_REACTION_OF_TYPE)],
    ),
    form![pat!("detach music from OBJECT EOL"), sys!(DETACH_MUSIC)],
    after!(
        "detach OBJECT",
        [pat!("leash EOL"), sys!(DETACH_OBJECT_LEASH)],
        [pat!("in game OBJECT from PLAYING_SIDE team EOL"), unsupported!()],
    ),
    form![pat!("detach [OBJECT] from OBJECT EOL"), sys!(FLOCK_DETACH), emit!(PopO)],
    form![pat!("swap creature from OBJECT to OBJECT EOL"), sys!(SWAP_CREATURE)],
    // queue, pause, load, save
    form![
        pat!("queue computer player EXPRESSION action STRING OBJECT OBJECT EOL"),
        sys!(QUEUE_COMPUTER_PLAYER_ACTION)
    ],
    after!(
        "queue OBJECT fight",
        [pat!("move CONST_EXPR EOL"), sys!(SET_CREATURE_QUEUE_FIGHT_MOVE)],
        [pat!("step CONST_EXPR EOL"), unsupported!()],
        [pat!("spell CONST_EXPR EOL"), unsupported!()],
    ),
    form![pat!("pause|unpause computer player EXPRESSION EOL"), sys!(ENABLE_DISABLE_COMPUTER_PLAYER2)],
    form![pat!("load computer player EXPRESSION personality STRING EOL"), unsupported!()],
    form![pat!("load map STRING EOL"), sys!(LOAD_MAP)],
    form![pat!("load my_creature at COORD_EXPR EOL"), sys!(LOAD_MY_CREATURE)],
    form![
        pat!("load creature CONST_EXPR STRING player EXPRESSION at COORD_EXPR EOL"),
        sys!(LOAD_CREATURE)
    ],
    form![pat!("save computer player EXPRESSION personality STRING EOL"), unsupported!()],
    form![pat!("save game in slot EXPRESSION EOL"), sys!(SAVE_GAME_IN_SLOT)],
    // stop
    form![pat!("stop all games for OBJECT EOL"), unsupported!()],
    form![
        pat!("stop all scripts excluding files STRING EOL"),
        sys!(STOP_ALL_SCRIPTS_IN_FILES_EXCLUDING)
    ],
    form![pat!("stop all scripts excluding STRING EOL"), sys!(STOP_ALL_SCRIPTS_EXCLUDING)],
    form![pat!("stop all immersion EOL"), sys!(STOP_ALL_IMMERSION)],
    form![pat!("stop script STRING EOL"), sys!(STOP_SCRIPT)],
    form![
        pat!("stop scripts in files STRING excluding STRING EOL"),
        sys!(STOP_SCRIPTS_IN_FILES_EXCLUDING)
    ],
    form![pat!("stop scripts in files STRING EOL"), sys!(STOP_SCRIPTS_IN_FILES)],
    form![
        emit!(PushB(false)),
        pat!("stop sound CONST_EXPR"),
        const_or!("AUDIO_SFX_BANK_TYPE_IN_GAME"),
        pat!("EOL"),
        sys!(STOP_SOUND_EFFECT)
    ],
    form![pat!("stop immersion CONST_EXPR EOL"), sys!(STOP_IMMERSION)],
    form![pat!("stop music EOL"), sys!(STOP_MUSIC)],
    after!(
        "stop SPIRIT_TYPE spirit",
        [pat!("pointing EOL"), sys!(STOP_POINTING)],
        [pat!("looking EOL"), sys!(STOP_LOOKING)],
    ),
    // start
    form![
        pat!("start say [extra] sound CONST_EXPR [at COORD_EXPR] EOL"),
        sys!(GAME_PLAY_SAY_SOUND_EFFECT)
    ],
    form![
        pat!("start sound CONST_EXPR"),
        emit!(PushConst("AUDIO_SFX_BANK_TYPE_IN_GAME")),
        emit!(PushC(0)),
        emit!(PushC(0)),
        emit!(PushC(0)),
        emit!(PushB(false)),
        pat!("EOL"),
        sys!(PLAY_SOUND_EFFECT)
    ],
    form![
        pat!("start sound CONST_EXPR"),
        emit!(PushConst("AUDIO_SFX_BANK_TYPE_IN_GAME")),
        pat!("at COORD_EXPR"),
        emit!(PushB(true)),
        pat!("EOL"),
        sys!(PLAY_SOUND_EFFECT)
    ],
    form![pat!("start sound CONST_EXPR CONST_EXPR [at COORD_EXPR] EOL"), sys!(PLAY_SOUND_EFFECT)],
    form![pat!("start immersion CONST_EXPR EOL"), sys!(START_IMMERSION)],
    form![pat!("start music CONST_EXPR EOL"), sys!(START_MUSIC)],
    form![
        pat!("start hand demo STRING [with pause on trigger] [without hand modify] EOL"),
        sys!(PLAY_HAND_DEMO)
    ],
    form![pat!("start jc special CONST_EXPR EOL"), sys!(PLAY_JC_SPECIAL)],
    after!(
        "start OBJECT",
        [pat!("with OBJECT as referee EOL"), unsupported!()],
        [pat!("fade out EOL"), sys!(VORTEX_FADE_OUT)],
    ),
    form![pat!("disband OBJECT EOL"), sys!(FLOCK_DISBAND)],
    form![
        pat!("populate OBJECT with EXPRESSION CONST_EXPR"),
        const_or!("SCRIPT_FIND_TYPE_ANY"),
        pat!("EOL"),
        sys!(POPULATE_CONTAINER)
    ],
    form![pat!("affect alignment by EXPRESSION EOL"), unsupported!()],
    form![pat!("build building at COORD_EXPR desire EXPRESSION EOL"), sys!(BUILD_BUILDING)],
    form![pat!("run map script line STRING EOL"), sys!(MAP_SCRIPT_FUNCTION)],
    form![pat!("run CONST_EXPR developer function EOL"), sys!(DEV_FUNCTION)],
    form![pat!("enter|exit temple EOL"), sys!(ENTER_EXIT_CITADEL)],
    form![pat!("restart music on OBJECT EOL"), unsupported!()],
    form![pat!("restart OBJECT EOL"), sys!(RESTART_OBJECT)],
    form![pat!("state VARIABLE CONST_EXPR position COORD_EXPR float EXPRESSION ulong EXPRESSION , EXPRESSION EOL"), unsupported!()],
    form![pat!("state VARIABLE CONST_EXPR EOL"), sys!(SET_SCRIPT_STATE)],
    // spirits
    after!(
        "make SPIRIT_TYPE spirit",
        [pat!("point to OBJECT [in world] EOL"), sys!(SPIRIT_POINT_GAME_THING)],
        [pat!("point at COORD_EXPR [in world] EOL"), sys!(SPIRIT_POINT_POS)],
        [
            pat!("play across EXPRESSION down EXPRESSION CONST_EXPR [speed EXPRESSION] EOL"),
            unsupported!()
        ],
        [pat!("cling across EXPRESSION down EXPRESSION EOL"), sys!(CLING_SPIRIT)],
        [pat!("fly across EXPRESSION down EXPRESSION EOL"), sys!(FLY_SPIRIT)],
        [pat!("look at OBJECT EOL"), sys!(LOOK_GAME_THING)],
        [pat!("look at COORD_EXPR EOL"), sys!(LOOK_AT_POSITION)],
        [pat!("appear EOL"), sys!(SPIRIT_APPEAR)],
        [pat!("disappear EOL"), sys!(SPIRIT_DISAPPEAR)],
    ),
    form![
        pat!("make OBJECT dance CONST_EXPR around COORD_EXPR time EXPRESSION EOL"),
        sys!(DANCE_CREATE),
        emit!(PopO)
    ],
    form![pat!("eject SPIRIT_TYPE spirit EOL"), sys!(SPIRIT_EJECT)],
    form![pat!("send SPIRIT_TYPE spirit home EOL"), sys!(SPIRIT_HOME)],
    // say
    form![emit!(PushB(false)), pat!("say sound CONST_EXPR playing EOL"), sys!(SAY_SOUND_EFFECT_PLAYING)],
    form![pat!("say STRING with number EXPRESSION EOL"), unsupported!()],
    form![
        pat!("say [single line] STRING with interaction"),
        emit!(PushI(1)),
        pat!("EOL"),
        sys!(TEMP_TEXT)
    ],
    form![
        pat!("say [single line] STRING without interaction"),
        emit!(PushI(2)),
        pat!("EOL"),
        sys!(TEMP_TEXT)
    ],
    form![pat!("say [single line] STRING"), emit!(PushI(0)), pat!("EOL"), sys!(TEMP_TEXT)],
    form![
        pat!("say [single line] CONST_EXPR with number EXPRESSION"),
        emit!(PushI(0)),
        pat!("EOL"),
        sys!(RUN_TEXT_WITH_NUMBER)
    ],
    form![
        pat!("say [single line] CONST_EXPR with interaction"),
        emit!(PushI(1)),
        pat!("EOL"),
        sys!(RUN_TEXT)
    ],
    form![
        pat!("say [single line] CONST_EXPR without interaction"),
        emit!(PushI(2)),
        pat!("EOL"),
        sys!(RUN_TEXT)
    ],
    form![pat!("say [single line] CONST_EXPR"), emit!(PushI(0)), pat!("EOL"), sys!(RUN_TEXT)],
    // text and camera details
    form![
        pat!("draw text STRING across EXPRESSION down EXPRESSION width EXPRESSION height EXPRESSION size EXPRESSION fade in time EXPRESSION second|seconds EOL"),
        sys!(GAME_DRAW_TEMP_TEXT)
    ],
    form![
        pat!("draw text CONST_EXPR across EXPRESSION down EXPRESSION width EXPRESSION height EXPRESSION size EXPRESSION fade in time EXPRESSION second|seconds EOL"),
        sys!(GAME_DRAW_TEXT)
    ],
    form![pat!("fade all draw text time EXPRESSION second|seconds EOL"), sys!(FADE_ALL_DRAW_TEXT)],
    form![pat!("fade ready EOL"), sys!(FADE_FINISHED)],
    form![pat!("store camera details EOL"), sys!(STORE_CAMERA_DETAILS)],
    form![pat!("restore camera details EOL"), sys!(RESTORE_CAMERA_DETAILS)],
    form![pat!("reset camera lens EOL"), emit!(PushF(0.0)), sys!(SET_CAMERA_LENS)],
    form![pat!("camera follow OBJECT distance EXPRESSION EOL"), sys!(SET_FOCUS_AND_POSITION_FOLLOW)],
    form![pat!("camera path CHALLENGE_CONST EOL"), sys!(RUN_CAMERA_PATH)],
    form![
        pat!("shake camera at COORD_EXPR radius EXPRESSION amplitude EXPRESSION time EXPRESSION EOL"),
        sys!(SHAKE_CAMERA)
    ],
];

impl Compiler {
    /// Parses statements until one does not start.
    pub(crate) fn parse_statements(&mut self, cx: &mut ParserContext) -> Result<(), ParseError> {
        while self.parse_statement(cx)?.is_some() {}
        Ok(())
    }

    /// One statement. `None` when the next symbol cannot start a statement,
    /// which leaves the stream untouched for the enclosing construct.
    pub(crate) fn parse_statement(&mut self, cx: &mut ParserContext) -> Result<Option<Symbol>, ParseError> {
        cx.last_error = None;
        let start = cx.stream.index();
        let lead = cx.stream.peek(true);
        if lead.is_kind(TokenKind::Identifier) {
            if cx.stream.check_ahead("ANY play") {
                self.parse(cx, "VARIABLE play CONST_EXPR [loop EXPRESSION] EOL", &[1.0])?;
                return Err(cx.not_implemented("Statement not implemented"));
            }
            return self.parse_assignment(cx, start).map(Some);
        }
        if !lead.is_kind(TokenKind::Keyword) {
            let e = cx.unexpected(&lead, "STATEMENT");
            cx.note(e);
            return Ok(None);
        }
        let custom = match lead.text() {
            "if" => Some(self.parse_if(cx, start)),
            "while" => Some(self.parse_while(cx, start)),
            "begin" if !cx.stream.check_ahead("begin ANY script") && !cx.stream.check_ahead("begin script") => {
                Some(self.parse_begin(cx, start))
            }
            "snapshot" => Some(self.parse_snapshot(cx, start)),
            "update" => Some(self.parse_update_snapshot(cx, start)),
            "wait" => Some(self.parse_wait(cx, start)),
            "label" => Some(self.parse_label(cx, start)),
            "jump" => Some(self.parse_jump(cx, start)),
            "challenge" => Some(self.parse_challenge(cx, start)),
            "run" if cx.stream.check_ahead("run script") || cx.stream.check_ahead("run background") => {
                Some(self.parse_run(cx, start))
            }
            "delete" if cx.stream.check_ahead("delete IDENTIFIER") => Some(self.parse_delete(cx, start)),
            "move" if cx.stream.check_ahead("move camera to IDENTIFIER") => Some(self.parse_move_camera_to(cx, start)),
            "set" if cx.stream.check_ahead("set camera to IDENTIFIER") => Some(self.parse_set_camera_to(cx, start)),
            _ => None,
        };
        if let Some(result) = custom {
            return result.map(Some);
        }
        if !Compiler::rule_starts_with(STATEMENT_RULES, &lead) {
            let e = cx.unexpected(&lead, "STATEMENT");
            cx.note(e);
            return Ok(None);
        }
        match self.try_rule(cx, STATEMENT_RULES, start, STATEMENT)? {
            Some(sym) => Ok(Some(sym)),
            None => {
                let e = cx.unexpected(&lead, "STATEMENT");
                Err(cx.best_error(e))
            }
        }
    }

    /// Assignments to a variable, an array slot or an object property.
    fn parse_assignment(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        if cx.stream.peek_at(1).is_keyword("of") {
            return self.parse_property_assignment(cx, start);
        }
        let name = cx.stream.next(true);
        let var_id = if cx.stream.peek(false).is_keyword("[") {
            self.parse_indexed(cx, &name)?
        } else {
            self.variable(cx, name.text())?.id
        };
        let operator = cx.stream.next(false);
        if !operator.is_kind(TokenKind::Keyword) {
            return Err(cx.unexpected(&operator, "=|+=|-=|*=|/=|++|--"));
        }
        match operator.text() {
            "=" => {
                self.push_var(cx, var_id);
                self.pop_i(cx);
                if self.parse_expression(cx, false)?.is_none() && self.parse_object(cx, false)?.is_none() {
                    let sym = cx.stream.peek(true);
                    let e = cx.unexpected(&sym, "EXPRESSION|OBJECT");
                    return Err(cx.best_error(e));
                }
                self.accept_eol(cx)?;
            }
            "+=" | "-=" | "*=" | "/=" => {
                self.push_var(cx, var_id);
                self.parse(cx, "EXPRESSION EOL", &[])?;
                self.compound(cx, operator.text());
            }
            "++" | "--" => {
                self.push_var(cx, var_id);
                self.accept_eol(cx)?;
                self.push_f(cx, 1.0);
                self.compound(cx, if operator.text() == "++" { "+=" } else { "-=" });
            }
            _ => return Err(cx.unexpected(&operator, "=|+=|-=|*=|/=|++|--")),
        }
        self.pop_var(cx, var_id);
        Ok(cx.stream.replace(start, STATEMENT))
    }

    /// `CONSTANT of VARIABLE op EXPRESSION`, through `GET_PROPERTY` and
    /// `SET_PROPERTY`.
    fn parse_property_assignment(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        let matched = self.parse(cx, "CONSTANT of VARIABLE", &[])?;
        let (Some(constant), Some(object)) = (&matched[0], &matched[2]) else {
            return Err(cx.fatal("Property assignment without a target"));
        };
        let property = self.constant_of(cx, constant)?;
        self.push_i(cx, property);
        self.push_variable(cx, object.text())?;
        self.sys2(cx, NativeFunction::GET_PROPERTY);
        let operator = cx.stream.next(false);
        let valid = operator.is_kind(TokenKind::Keyword) && matches!(operator.text(), "=" | "+=" | "-=" | "*=" | "/=");
        if !valid {
            return Err(cx.unexpected(&operator, "=|+=|-=|*=|/="));
        }
        if operator.text() == "=" {
            self.pop_i(cx);
        }
        self.parse(cx, "EXPRESSION EOL", &[])?;
        self.compound(cx, operator.text());
        self.sys2(cx, NativeFunction::SET_PROPERTY);
        Ok(cx.stream.replace(start, STATEMENT))
    }

    /// The arithmetic behind a compound assignment operator; nothing for `=`.
    fn compound(&mut self, cx: &ParserContext, operator: &str) {
        match operator {
            "+=" => {
                self.add_f(cx);
            }
            "-=" => {
                self.sub_f(cx);
            }
            "*=" => {
                self.arith(cx, Opcode::Mul);
            }
            "/=" => {
                self.arith(cx, Opcode::Div);
            }
            _ => {}
        }
    }

    /// `delete VARIABLE [with fade|explosion|explode|temple explode]`. The
    /// variable is zeroed afterwards.
    fn parse_delete(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        self.accept_keyword(cx, "delete")?;
        let name = self.parse(cx, "VARIABLE", &[])?.remove(0);
        let var = match &name {
            Some(sym) => self.variable(cx, sym.text())?,
            None => return Err(cx.fatal("Missing variable")),
        };
        let mode = if self.skip_keyword(cx, "with") {
            let sym = cx.stream.next(true);
            match sym.text() {
                "fade" if sym.is_kind(TokenKind::Keyword) => 1,
                "explosion" | "explode" if sym.is_kind(TokenKind::Keyword) => 2,
                "temple" if sym.is_kind(TokenKind::Keyword) => {
                    self.accept_keyword(cx, "explode")?;
                    3
                }
                _ => return Err(cx.unexpected(&sym, "fade|explosion|temple")),
            }
        } else {
            0
        };
        self.push_i(cx, mode);
        self.accept_eol(cx)?;
        self.sys(cx, NativeFunction::OBJECT_DELETE)?;
        self.zero(cx, var.id);
        Ok(cx.stream.replace(start, STATEMENT))
    }

    /// Pushes the focus then the position of a named camera of the current
    /// challenge.
    fn push_named_camera(&mut self, cx: &mut ParserContext) -> Result<(), ParseError> {
        let sym = self.accept_kind(cx, TokenKind::Identifier)?;
        let name = format!("{}{}", cx.challenge_prefix(), sym.text());
        let id = self.constant_value(cx, &name)?;
        self.push_i(cx, id);
        self.sys(cx, NativeFunction::CONVERT_CAMERA_FOCUS)?;
        self.push_i(cx, id);
        self.sys(cx, NativeFunction::CONVERT_CAMERA_POSITION)?;
        Ok(())
    }

    /// `move camera to NAME time T`. The compatible lowering pushes the time
    /// once, so `MOVE_CAMERA_FOCUS` finds no time of its own. With `fix_bugs`
    /// the time, which must then be a number or a variable, is pushed for
    /// both calls.
    fn parse_move_camera_to(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        self.parse(cx, "move camera to", &[])?;
        self.push_named_camera(cx)?;
        if self.options.fix_bugs {
            self.accept_keyword(cx, "time")?;
            let time = cx.stream.next(true);
            self.accept_eol(cx)?;
            if time.is_kind(TokenKind::Identifier) {
                self.push_variable(cx, time.text())?;
                self.swap_f(cx, 4);
                self.push_variable(cx, time.text())?;
            } else if time.is_kind(TokenKind::Number) {
                let value = match time.token().map(|t| t.float_value()) {
                    Some(Ok(v)) => v,
                    _ => return Err(cx.syntax_at(&time, format!("Invalid number: {}", time))),
                };
                self.push_f(cx, value);
                self.swap_f(cx, 4);
                self.push_f(cx, value);
            } else {
                return Err(cx.unexpected(&time, "NUMBER|IDENTIFIER"));
            }
        } else {
            self.parse(cx, "time EXPRESSION EOL", &[])?;
            self.swap_f(cx, 4);
        }
        self.sys(cx, NativeFunction::MOVE_CAMERA_POSITION)?;
        self.sys(cx, NativeFunction::MOVE_CAMERA_FOCUS)?;
        Ok(cx.stream.replace(start, STATEMENT))
    }

    /// `set camera to NAME`.
    fn parse_set_camera_to(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        self.parse(cx, "set camera to", &[])?;
        self.push_named_camera(cx)?;
        self.accept_eol(cx)?;
        self.sys(cx, NativeFunction::SET_CAMERA_POSITION)?;
        self.sys(cx, NativeFunction::SET_CAMERA_FOCUS)?;
        Ok(cx.stream.replace(start, STATEMENT))
    }

    /// `( [EXPRESSION|OBJECT {, EXPRESSION|OBJECT}] )`, returning how many
    /// values were pushed.
    pub(crate) fn parse_parameters(&mut self, cx: &mut ParserContext) -> Result<usize, ParseError> {
        self.accept_keyword(cx, "(")?;
        let mut argc = 0;
        if !cx.stream.peek(true).is_keyword(")") {
            loop {
                if self.parse_expression(cx, false)?.is_none() && self.parse_object(cx, false)?.is_none() {
                    let sym = cx.stream.peek(true);
                    let e = cx.unexpected(&sym, "EXPRESSION|OBJECT");
                    return Err(cx.best_error(e));
                }
                argc += 1;
                if !self.skip_keyword(cx, ",") {
                    break;
                }
            }
        }
        self.accept_keyword(cx, ")")?;
        Ok(argc)
    }

    fn optional_parameters(&mut self, cx: &mut ParserContext) -> Result<usize, ParseError> {
        if cx.stream.peek(false).is_keyword("(") {
            self.parse_parameters(cx)
        } else {
            Ok(0)
        }
    }

    /// `[success E] [alignment E] CONST_EXPR SCRIPT[(args)]`: the script is
    /// passed by name, followed by its arguments and their count.
    fn parse_snapshot_target(&mut self, cx: &mut ParserContext) -> Result<(), ParseError> {
        let matched = self.parse(cx, "[success EXPRESSION] [alignment EXPRESSION] CONST_EXPR IDENTIFIER", &[])?;
        let Some(script) = matched.get(5).cloned().flatten() else {
            return Err(cx.fatal("Missing snapshot script"));
        };
        let offset = self.store_string(cx, script.text())?;
        self.push_i(cx, offset);
        let argc = self.optional_parameters(cx)?;
        self.accept_eol(cx)?;
        self.push_i(cx, argc as i32);
        self.push_challenge_id(cx)?;
        Ok(())
    }

    fn parse_snapshot(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        self.parse(cx, "snapshot quest|challenge", &[])?;
        self.sys(cx, NativeFunction::GET_CAMERA_POSITION)?;
        self.sys(cx, NativeFunction::GET_CAMERA_FOCUS)?;
        self.parse_snapshot_target(cx)?;
        self.sys(cx, NativeFunction::SNAPSHOT)?;
        Ok(cx.stream.replace(start, STATEMENT))
    }

    fn parse_update_snapshot(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        self.parse(cx, "update snapshot", &[])?;
        if cx.stream.peek(true).is_keyword("details") {
            self.sys(cx, NativeFunction::GET_CAMERA_POSITION)?;
            self.sys(cx, NativeFunction::GET_CAMERA_FOCUS)?;
            self.parse(
                cx,
                "details [success EXPRESSION] [alignment EXPRESSION] CONST_EXPR [taking picture] EOL",
                &[],
            )?;
            self.push_challenge_id(cx)?;
            self.sys(cx, NativeFunction::UPDATE_SNAPSHOT_PICTURE)?;
        } else {
            self.parse_snapshot_target(cx)?;
            self.sys(cx, NativeFunction::UPDATE_SNAPSHOT)?;
        }
        Ok(cx.stream.replace(start, STATEMENT))
    }

    /// `run [background] script NAME[(args)]`.
    fn parse_run(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        self.accept_keyword(cx, "run")?;
        let background = self.skip_keyword(cx, "background");
        self.accept_keyword(cx, "script")?;
        let name = self.accept_kind(cx, TokenKind::Identifier)?;
        let argc = self.optional_parameters(cx)?;
        self.accept_eol(cx)?;
        self.call(cx, name.text(), argc, background);
        Ok(cx.stream.replace(start, STATEMENT))
    }

    /// `wait [until] CONDITION`: loops back onto the condition until it holds.
    fn parse_wait(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        let again = self.ip();
        self.accept_keyword(cx, "wait")?;
        self.skip_keyword(cx, "until");
        self.parse(cx, "CONDITION EOL", &[])?;
        self.jz_to(cx, again);
        Ok(cx.stream.replace(start, STATEMENT))
    }

    fn parse_label(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        self.accept_keyword(cx, "label")?;
        let name = self.accept_kind(cx, TokenKind::Identifier)?;
        self.accept_eol(cx)?;
        let script_id = cx.scope()?.script_id;
        let ip = self.ip();
        if !self.refs.add_label(script_id, name.text(), ip) {
            return Err(cx.fatal(format!("Duplicate label: {}", name.text())));
        }
        Ok(cx.stream.replace(start, STATEMENT))
    }

    fn parse_jump(&mut self, cx: &mut ParserContext, start: usize) -> Result<Symbol, ParseError> {
        self.accept_keyword(cx, "jump")?;
        let name = self.accept_kind(cx, TokenKind::Identifier)?;
        self.accept_eol(cx)?;
        let script_id = cx.scope()?.script_id;
        self.jmp_label(cx, script_id, name.text());
        Ok(cx.stream.replace(start, STATEMENT))
    }
}
